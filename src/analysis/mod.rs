/// Analysis core: schema resolution, mode selection and aggregation.
///
/// Architecture:
/// ```text
///        Table
///          │
///          ▼
///   ┌──────────────┐
///   │    schema     │  role → column name (case-insensitive)
///   └──────────────┘
///          │
///          ▼
///   ┌──────────────┐
///   │     mode      │  pick Age / Trend / SinglePeriod / MultiPeriod
///   └──────────────┘
///     │    │    │    │
///     ▼    ▼    ▼    ▼
///    age trend aggregate stack
///          │
///          ▼
///       Analysis   (AggregatedSeries / TimeSeriesMatrix / TrendSeries)
/// ```

pub mod age;
pub mod aggregate;
pub mod households;
pub mod mode;
pub mod schema;
pub mod series;
pub mod stack;
pub mod trend;

pub use mode::{analyze, Analysis, AnalysisRequest, Mode};
