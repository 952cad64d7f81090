//! Page-mode layout: node splitting, measurement and pagination.

pub mod debounce;
pub mod measure;
pub mod nodes;
pub mod paginate;

pub use debounce::{Debouncer, PendingRun, repagination_delay};
pub use measure::{LayoutMeasurementProvider, TextMetricsMeasurer};
pub use nodes::{ContentNode, NodeKind, parse_nodes};
pub use paginate::{PagePlan, PageSet, Paginator};
