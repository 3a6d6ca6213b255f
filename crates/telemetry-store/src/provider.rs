//! Storage backend interfaces.

use crate::StoreError;
use std::time::Duration;

/// Source of prepared statements.
///
/// Every statement obtained from [`ConnectionProvider::prepare`] must be
/// handed back through [`ConnectionProvider::release`].
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
pub trait ConnectionProvider: Send + Sync {
    /// Prepare a parameterized statement.
    fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedInsert>, StoreError>;

    /// Return a statement to the provider.
    fn release(&self, statement: Box<dyn PreparedInsert>) -> Result<(), StoreError>;
}

/// A prepared insert with positional parameters.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
pub trait PreparedInsert: Send {
    /// Limit how long execution may wait on the backend.
    fn set_query_timeout(&mut self, timeout: Duration) -> Result<(), StoreError>;

    /// Bind a text value (or NULL) to the 1-based parameter `index`.
    fn bind_text(&mut self, index: usize, value: Option<String>) -> Result<(), StoreError>;

    /// Execute the statement, returning the number of affected rows.
    fn execute_update(&mut self) -> Result<usize, StoreError>;
}
