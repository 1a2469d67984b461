//! View analysis: how much geometry is visible around each node.

mod analysis;
mod directions;

pub use analysis::{view_analysis_aggregate, view_analysis_raw, ViewAggregate, ViewAnalysis, ViewConfig};
pub use directions::{fibonacci_directions, spherical_distribute};
