//! Usage event capture.
//!
//! A [`UsageAccumulator`] collects the attributes of one event while an
//! operation runs. [`UsageRecorder`] completes it from the ambient context
//! through [`FieldResolver`], then hands the finished record to the store.
//!
//! Accumulators live either as plain owned values or in per-thread storage
//! managed by [`scope`].

mod accumulator;
mod recorder;
mod resolver;
pub mod scope;

pub use accumulator::UsageAccumulator;
pub use recorder::{RecordOutcome, UsageRecorder};
pub use resolver::{FieldResolver, SkipReason};
pub use scope::ScopeGuard;
