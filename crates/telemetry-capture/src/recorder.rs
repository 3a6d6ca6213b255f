//! Finalize-and-persist entry point.

use crate::{scope, FieldResolver, SkipReason, UsageAccumulator};
use std::sync::Arc;
use telemetry_config::TelemetryConfig;
use telemetry_store::{
    AuditSink, ConnectionProvider, PersistError, QueryTimeouts, SqliteConnectionProvider,
    StoreError,
};
use telemetry_types::AmbientContext;
use tracing::debug;

/// Result of a record call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The row was written.
    Persisted { rows: usize },
    /// A mandatory field was missing; nothing was written.
    Skipped(SkipReason),
}

impl RecordOutcome {
    /// Whether a row was written.
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted { .. })
    }
}

/// Resolves an accumulator and writes it through an [`AuditSink`].
///
/// Validation skips are reported as [`RecordOutcome::Skipped`], never as
/// errors. Only storage failures produce a [`PersistError`], which callers
/// should log rather than propagate into the operation being observed.
pub struct UsageRecorder {
    resolver: FieldResolver,
    sink: AuditSink,
    provider: Arc<dyn ConnectionProvider>,
}

impl UsageRecorder {
    /// Recorder writing through `provider`, with fallbacks and query profiles
    /// from `context`.
    pub fn new(
        context: Arc<dyn AmbientContext>,
        provider: Arc<dyn ConnectionProvider>,
        timeouts: QueryTimeouts,
    ) -> Self {
        Self {
            resolver: FieldResolver::new(Arc::clone(&context)),
            sink: AuditSink::new(context, timeouts),
            provider,
        }
    }

    /// Recorder backed by the SQLite database and timeouts in `config`.
    pub fn from_config(
        context: Arc<dyn AmbientContext>,
        config: &TelemetryConfig,
    ) -> Result<Self, StoreError> {
        let provider = SqliteConnectionProvider::from_config(&config.database)?;
        let timeouts = QueryTimeouts::from_config(&config.query_timeouts);
        Ok(Self::new(context, Arc::new(provider), timeouts))
    }

    /// Resolve `acc` and persist one row for it.
    pub fn record(&self, acc: &mut UsageAccumulator) -> Result<RecordOutcome, PersistError> {
        if let Err(reason) = self.resolver.resolve(acc) {
            return Ok(RecordOutcome::Skipped(reason));
        }

        let record = acc.snapshot();
        let rows = self.sink.persist(self.provider.as_ref(), &record)?;
        debug!(rows, instance_id = %acc.instance_id(), "usage recorded");
        Ok(RecordOutcome::Persisted { rows })
    }

    /// Record the calling scope's accumulator.
    ///
    /// The accumulator stays in place; discard it when the scope ends.
    pub fn record_current(&self) -> Result<RecordOutcome, PersistError> {
        scope::with_current(|acc| self.record(acc))
    }
}
