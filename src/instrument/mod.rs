/// Instrument layer: parsers for vendor-specific export files.
///
/// Each instrument module turns the vendor's CSV exports into the core
/// types from [`crate::data::model`]:
///
/// ```text
///  vendor export files
///        │
///        ▼
///   ┌──────────────┐
///   │ cary_eclipse │  EEM grid / absorbance / water Raman
///   └──────────────┘
///        │
///        ▼
///   Eem, AbsorbanceSpectrum, WaterRamanSpectrum
/// ```
pub mod cary_eclipse;
