//! Live and frozen period views over the tier board.
//!
//! A request either classifies the branch feed on the spot or returns a previously closed
//! snapshot exactly as stored. Closing a period always goes through the live path first.

pub mod resolver;
pub mod router;
pub mod view;

#[cfg(test)]
mod tests;

pub use resolver::{
    ClosedPeriod, FrozenBoard, LiveBoard, PeriodBoard, PeriodViewResolver, ResolveError,
};
pub use router::period_router;
pub use view::{ViewMode, ViewModeError, ViewQuery};
