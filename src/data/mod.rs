/// Data layer: table types, loading, and row filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  district / year / column predicates
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  model    │  Table + schema → Dataset of Records
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
