//! Fluorescence Excitation-Emission Matrix (EEM) toolkit: load instrument
//! exports, correct and normalize the grids, and run basic analyses.
//!
//! The typical flow is instrument export → [`data::model::Eem`] →
//! [`preprocess`] corrections → [`analysis`], with whole measurement
//! campaigns stored as [`data::model::EemDataset`] in Parquet or JSON.

pub mod analysis;
pub mod data;
pub mod instrument;
pub mod preprocess;

pub use analysis::{Region, regional_integration, total_fluorescence};
pub use data::model::{
    AbsorbanceSpectrum, Eem, EemDataset, MetadataValue, ModelError, WaterRamanSpectrum,
};
pub use instrument::cary_eclipse::CaryEclipse;
