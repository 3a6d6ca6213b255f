//! Usage audit types.
//!
//! An [`AuditRecord`] is the finalized, immutable set of attributes for one
//! tracked event. Records are assembled with [`AuditRecordBuilder`]. The
//! [`AmbientContext`] trait describes the execution-context facility that
//! supplies fallback values for fields a call site leaves unset.

mod clock;
mod context;
mod record;

pub use clock::now_millis;
pub use context::{AmbientContext, StaticContext};
pub use record::{AuditRecord, AuditRecordBuilder, DEFAULT_OBJECT_TYPE};

#[cfg(any(test, feature = "mocks"))]
pub use context::MockAmbientContext;
