//! Usage audit insert.

use crate::{ConnectionProvider, PersistError, PreparedInsert, QueryTimeouts, StoreError};
use std::sync::Arc;
use telemetry_types::{AmbientContext, AuditRecord};
use tracing::{debug, error};

/// Insert for one usage audit row.
///
/// The row id, tenant and organization are produced by the statement
/// itself; the caller supplies the ten positional parameters.
pub const INSERT_USAGE_AUDIT: &str = "INSERT INTO usage_audit \
    (usage_audit_id, tenant_id, org_id, created_by, updated_by, session_id, object_id, \
    module_id, command, classname, object_type, process_time, metadata) \
    VALUES (lower(hex(randomblob(16))), '0', '0', ?, ?, ?, ?, ?, ?, ?, ?, CAST(? AS INTEGER), ?)";

/// Writes audit records to a storage backend.
pub struct AuditSink {
    context: Arc<dyn AmbientContext>,
    timeouts: QueryTimeouts,
}

impl AuditSink {
    /// Create a sink that picks statement timeouts from the context's query
    /// profile.
    pub fn new(context: Arc<dyn AmbientContext>, timeouts: QueryTimeouts) -> Self {
        Self { context, timeouts }
    }

    /// Insert one row for `record` and return the affected row count.
    ///
    /// The statement is always released before returning. A release failure
    /// is logged and does not change the outcome.
    pub fn persist(
        &self,
        provider: &dyn ConnectionProvider,
        record: &AuditRecord,
    ) -> Result<usize, PersistError> {
        let mut statement = provider.prepare(INSERT_USAGE_AUDIT).map_err(fail)?;
        let result = self.bind_and_execute(statement.as_mut(), record);
        release(provider, statement);
        let rows = result.map_err(fail)?;

        debug!(rows, session_id = ?record.session_id(), "usage audit persisted");
        Ok(rows)
    }

    fn bind_and_execute(
        &self,
        statement: &mut dyn PreparedInsert,
        record: &AuditRecord,
    ) -> Result<usize, StoreError> {
        let profile = self.context.current_query_profile();
        statement.set_query_timeout(self.timeouts.for_profile(profile.as_deref()))?;

        let values = [
            record.user_id(),
            record.user_id(),
            record.session_id(),
            record.object_id(),
            record.module_id(),
            record.command(),
            record.classname(),
            record.object_type(),
        ];
        let count = values.len();
        for (offset, value) in values.into_iter().enumerate() {
            statement.bind_text(offset + 1, value.map(str::to_string))?;
        }
        statement.bind_text(count + 1, record.timestamp_text())?;
        statement.bind_text(count + 2, record.metadata_text())?;

        statement.execute_update()
    }
}

fn fail(error: StoreError) -> PersistError {
    match &error {
        StoreError::Backend { .. } => {
            error!(sql = INSERT_USAGE_AUDIT, %error, "SQL error in usage audit insert")
        }
        StoreError::Unexpected(_) => {
            error!(sql = INSERT_USAGE_AUDIT, %error, "exception in usage audit insert")
        }
    }
    PersistError::from(error)
}

/// Hand the statement back to its provider. Failures are logged only.
fn release(provider: &dyn ConnectionProvider, statement: Box<dyn PreparedInsert>) {
    if let Err(error) = provider.release(statement) {
        error!(sql = INSERT_USAGE_AUDIT, %error, "error releasing usage audit statement");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MockConnectionProvider, MockPreparedInsert, SqliteConnectionProvider};
    use mockall::Sequence;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::time::Duration;
    use telemetry_types::{MockAmbientContext, StaticContext};
    use test_case::test_case;

    fn full_record() -> AuditRecord {
        AuditRecord::builder()
            .user_id("user1")
            .session_id("session1")
            .object_id("object1")
            .module_id("module1")
            .command("command1")
            .classname("TestClass")
            .object_type("P")
            .timestamp(123_456)
            .metadata(json!({"test": "data"}))
            .build()
    }

    fn context_with_profile(profile: Option<&'static str>) -> Arc<dyn AmbientContext> {
        let mut context = MockAmbientContext::new();
        context
            .expect_current_query_profile()
            .times(1)
            .return_const(profile.map(str::to_string));
        Arc::new(context)
    }

    fn sink(profile: Option<&'static str>) -> AuditSink {
        AuditSink::new(context_with_profile(profile), QueryTimeouts::default())
    }

    /// Statement that records every bind and returns `outcome` on execute.
    fn recording_statement(
        bound: Arc<Mutex<Vec<(usize, Option<String>)>>>,
        outcome: Result<usize, StoreError>,
    ) -> MockPreparedInsert {
        let mut statement = MockPreparedInsert::new();
        statement
            .expect_set_query_timeout()
            .times(1)
            .returning(|_| Ok(()));
        statement
            .expect_bind_text()
            .times(10)
            .returning(move |index, value| {
                bound.lock().push((index, value));
                Ok(())
            });
        statement
            .expect_execute_update()
            .times(1)
            .return_once(move || outcome);
        statement
    }

    fn provider_returning(
        statement: MockPreparedInsert,
        release: Result<(), StoreError>,
    ) -> MockConnectionProvider {
        let mut provider = MockConnectionProvider::new();
        provider
            .expect_prepare()
            .withf(|sql| sql.starts_with("INSERT INTO usage_audit"))
            .times(1)
            .return_once(move |_| Ok(Box::new(statement)));
        provider
            .expect_release()
            .times(1)
            .return_once(move |_| release);
        provider
    }

    #[test]
    fn test_persist_binds_nine_values_in_order() {
        let bound = Arc::new(Mutex::new(Vec::new()));
        let statement = recording_statement(Arc::clone(&bound), Ok(1));
        let provider = provider_returning(statement, Ok(()));

        let rows = sink(Some("default")).persist(&provider, &full_record()).unwrap();
        assert_eq!(rows, 1);

        let bound = bound.lock();
        let values: Vec<Option<&str>> = bound.iter().map(|(_, v)| v.as_deref()).collect();
        let indices: Vec<usize> = bound.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, (1..=10).collect::<Vec<_>>());
        assert_eq!(
            values,
            vec![
                Some("user1"),
                Some("user1"),
                Some("session1"),
                Some("object1"),
                Some("module1"),
                Some("command1"),
                Some("TestClass"),
                Some("P"),
                Some("123456"),
                Some("{\n  \"test\": \"data\"\n}"),
            ]
        );
    }

    #[test_case(Some("long"), Duration::from_secs(60) ; "named profile")]
    #[test_case(Some("unknown"), Duration::from_secs(10) ; "unknown profile")]
    #[test_case(None, Duration::from_secs(10) ; "no profile")]
    fn test_persist_applies_profile_timeout(profile: Option<&'static str>, expected: Duration) {
        let mut statement = MockPreparedInsert::new();
        statement
            .expect_set_query_timeout()
            .withf(move |timeout| *timeout == expected)
            .times(1)
            .returning(|_| Ok(()));
        statement.expect_bind_text().returning(|_, _| Ok(()));
        statement.expect_execute_update().returning(|| Ok(1));
        let provider = provider_returning(statement, Ok(()));

        assert_eq!(sink(profile).persist(&provider, &full_record()), Ok(1));
    }

    #[test]
    fn test_backend_error_carries_code_and_message() {
        let bound = Arc::new(Mutex::new(Vec::new()));
        let statement = recording_statement(
            bound,
            Err(StoreError::Backend {
                code: Some(12345),
                message: "Database error".to_string(),
            }),
        );
        let provider = provider_returning(statement, Ok(()));

        let error = sink(None).persist(&provider, &full_record()).unwrap_err();
        assert_eq!(error.code, Some(12345));
        assert!(error.to_string().contains("12345"));
        assert!(error.to_string().contains("Database error"));
        assert_eq!(error.to_string(), "@CODE=12345@Database error");
    }

    #[test]
    fn test_unexpected_error_has_empty_code_segment() {
        let mut statement = MockPreparedInsert::new();
        statement
            .expect_set_query_timeout()
            .returning(|_| Ok(()));
        statement
            .expect_bind_text()
            .times(1)
            .returning(|_, _| Err(StoreError::unexpected("Unexpected error")));
        statement.expect_execute_update().times(0);
        let provider = provider_returning(statement, Ok(()));

        let error = sink(None).persist(&provider, &full_record()).unwrap_err();
        assert_eq!(error.to_string(), "@CODE=@Unexpected error");
    }

    #[test]
    fn test_release_follows_execute() {
        let mut seq = Sequence::new();
        let mut statement = MockPreparedInsert::new();
        statement
            .expect_set_query_timeout()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        statement
            .expect_bind_text()
            .times(10)
            .returning(|_, _| Ok(()));
        statement
            .expect_execute_update()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(1));

        let mut provider = MockConnectionProvider::new();
        provider
            .expect_prepare()
            .times(1)
            .return_once(move |_| Ok(Box::new(statement)));
        provider
            .expect_release()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        assert_eq!(sink(None).persist(&provider, &full_record()), Ok(1));
    }

    #[test]
    fn test_release_failure_after_success_is_absorbed() {
        let bound = Arc::new(Mutex::new(Vec::new()));
        let statement = recording_statement(bound, Ok(1));
        let provider = provider_returning(statement, Err(StoreError::unexpected("release failed")));

        assert_eq!(sink(None).persist(&provider, &full_record()), Ok(1));
    }

    #[test]
    fn test_release_failure_does_not_mask_execute_failure() {
        let bound = Arc::new(Mutex::new(Vec::new()));
        let statement = recording_statement(
            bound,
            Err(StoreError::Backend {
                code: Some(7),
                message: "locked".to_string(),
            }),
        );
        let provider = provider_returning(statement, Err(StoreError::unexpected("release failed")));

        let error = sink(None).persist(&provider, &full_record()).unwrap_err();
        assert_eq!(error.to_string(), "@CODE=7@locked");
    }

    #[test]
    fn test_prepare_failure_releases_nothing() {
        let mut context = MockAmbientContext::new();
        context.expect_current_query_profile().times(0);
        let sink = AuditSink::new(Arc::new(context), QueryTimeouts::default());

        let mut provider = MockConnectionProvider::new();
        provider.expect_prepare().times(1).return_once(|_| {
            Err(StoreError::Backend {
                code: None,
                message: "connection lost".to_string(),
            })
        });
        provider.expect_release().times(0);

        let error = sink.persist(&provider, &full_record()).unwrap_err();
        assert_eq!(error.to_string(), "@CODE=@connection lost");
    }

    #[test]
    fn test_persist_into_sqlite() {
        let provider = SqliteConnectionProvider::open_in_memory().unwrap();
        let sink = AuditSink::new(
            Arc::new(StaticContext::new().with_query_profile("default")),
            QueryTimeouts::default(),
        );

        assert_eq!(sink.persist(&provider, &full_record()), Ok(1));
        assert_eq!(sink.persist(&provider, &full_record()), Ok(1));
        assert_eq!(provider.outstanding_statements(), 0);

        let rows = provider.rows_for_session("session1").unwrap();
        assert_eq!(rows.len(), 2);
        assert_ne!(rows[0].id, rows[1].id);
        assert_eq!(rows[0].id.len(), 32);

        let row = &rows[0];
        assert_eq!(row.tenant_id, "0");
        assert_eq!(row.org_id, "0");
        assert_eq!(row.created_by, "user1");
        assert_eq!(row.updated_by, "user1");
        assert_eq!(row.object_id, "object1");
        assert_eq!(row.module_id, "module1");
        assert_eq!(row.command, "command1");
        assert_eq!(row.classname.as_deref(), Some("TestClass"));
        assert_eq!(row.object_type, "P");
        assert_eq!(row.process_time, 123_456);
        let metadata: serde_json::Value =
            serde_json::from_str(row.metadata.as_deref().unwrap()).unwrap();
        assert_eq!(metadata, json!({"test": "data"}));
    }

    #[test]
    fn test_incomplete_record_reports_sqlite_constraint_code() {
        let provider = SqliteConnectionProvider::open_in_memory().unwrap();
        let sink = AuditSink::new(Arc::new(StaticContext::new()), QueryTimeouts::default());
        let partial = AuditRecord::builder()
            .user_id("user1")
            .session_id("session1")
            .command("command1")
            .build();

        let error = sink.persist(&provider, &partial).unwrap_err();
        let code = rusqlite::ffi::SQLITE_CONSTRAINT_NOTNULL;
        assert_eq!(error.code, Some(code));
        assert!(error.to_string().starts_with(&format!("@CODE={code}@")));
        assert!(error.message.contains("NOT NULL constraint failed"));
        assert_eq!(provider.outstanding_statements(), 0);
    }
}
