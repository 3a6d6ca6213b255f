//! Ambient execution context.

/// Process-wide, scope-aware source of the current actor, module and process
/// identity.
///
/// Implementations answer for the calling execution scope. `None` and the
/// empty string both mean "not known".
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
pub trait AmbientContext: Send + Sync {
    /// User acting in the current scope.
    fn current_user_id(&self) -> Option<String>;

    /// Module owning the current operation.
    fn current_module_id(&self) -> Option<String>;

    /// Type of the process being run.
    fn current_process_type(&self) -> Option<String>;

    /// Identifier of the process being run.
    fn current_process_id(&self) -> Option<String>;

    /// Backend performance profile used to pick a statement timeout.
    fn current_query_profile(&self) -> Option<String>;
}

/// Ambient context with fixed values.
///
/// Suits background jobs whose identity is known up front.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticContext {
    user_id: Option<String>,
    module_id: Option<String>,
    process_type: Option<String>,
    process_id: Option<String>,
    query_profile: Option<String>,
}

impl StaticContext {
    /// Create a context that knows nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user ID.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the module ID.
    pub fn with_module_id(mut self, module_id: impl Into<String>) -> Self {
        self.module_id = Some(module_id.into());
        self
    }

    /// Set the process type.
    pub fn with_process_type(mut self, process_type: impl Into<String>) -> Self {
        self.process_type = Some(process_type.into());
        self
    }

    /// Set the process ID.
    pub fn with_process_id(mut self, process_id: impl Into<String>) -> Self {
        self.process_id = Some(process_id.into());
        self
    }

    /// Set the query profile.
    pub fn with_query_profile(mut self, profile: impl Into<String>) -> Self {
        self.query_profile = Some(profile.into());
        self
    }
}

impl AmbientContext for StaticContext {
    fn current_user_id(&self) -> Option<String> {
        self.user_id.clone()
    }

    fn current_module_id(&self) -> Option<String> {
        self.module_id.clone()
    }

    fn current_process_type(&self) -> Option<String> {
        self.process_type.clone()
    }

    fn current_process_id(&self) -> Option<String> {
        self.process_id.clone()
    }

    fn current_query_profile(&self) -> Option<String> {
        self.query_profile.clone()
    }
}
