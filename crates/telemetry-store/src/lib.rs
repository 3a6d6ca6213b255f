//! Usage audit persistence.
//!
//! [`AuditSink`] writes one [`telemetry_types::AuditRecord`] per call through
//! a [`ConnectionProvider`]. The provider abstraction keeps the sink
//! independent of the backend; [`SqliteConnectionProvider`] is the bundled
//! implementation.

mod error;
mod provider;
mod sink;
mod sqlite;
mod timeout;

pub use error::{PersistError, StoreError};
pub use provider::{ConnectionProvider, PreparedInsert};
pub use sink::{AuditSink, INSERT_USAGE_AUDIT};
pub use sqlite::{ensure_schema, BASE_BUSY_TIMEOUT, SqliteConnectionProvider, UsageAuditRow};
pub use timeout::QueryTimeouts;

#[cfg(any(test, feature = "mocks"))]
pub use provider::{MockConnectionProvider, MockPreparedInsert};
