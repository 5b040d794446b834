/// Data layer: core types, dataset I/O, and metadata filtering.
///
/// Architecture:
/// ```text
///  .parquet / .json       instrument exports
///        │                       │
///        ▼                       ▼
///   ┌──────────┐          ┌────────────┐
///   │  loader   │          │ instrument │
///   └──────────┘          └────────────┘
///        │                       │
///        ▼                       ▼
///   ┌────────────┐     Eem, AbsorbanceSpectrum,
///   │ EemDataset │      WaterRamanSpectrum
///   └────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply metadata predicates → filtered indices
///   └──────────┘
/// ```
pub mod filter;
pub mod loader;
pub mod model;
pub mod writer;
