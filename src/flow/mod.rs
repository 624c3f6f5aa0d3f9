//! Driving the flow over time.
//!
//! [`StepDriver`] replaces global "flow enabled" and "flow type" state with an
//! explicit object: a host toggles it, ticks it once per frame, and polls its
//! upload flag.

mod clock;
mod driver;
mod options;

pub use clock::{Clock, ManualClock, SystemClock};
pub use driver::{FlowState, FlowVariant, StepDriver, StepReport};
pub use options::FlowOptions;
