//! Completion and validation of accumulated fields.

use crate::UsageAccumulator;
use std::fmt;
use std::sync::Arc;
use telemetry_types::{now_millis, AmbientContext, DEFAULT_OBJECT_TYPE};
use tracing::{debug, error};

/// Mandatory field that was still missing after fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    SessionId,
    Command,
    UserId,
    ModuleId,
    ObjectId,
}

impl SkipReason {
    /// Field name as it appears in log output.
    pub fn field(self) -> &'static str {
        match self {
            Self::SessionId => "session_id",
            Self::Command => "command",
            Self::UserId => "user_id",
            Self::ModuleId => "module_id",
            Self::ObjectId => "object_id",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing {}", self.field())
    }
}

/// Fills missing fields from the ambient context and rejects incomplete
/// accumulators.
#[derive(Clone)]
pub struct FieldResolver {
    context: Arc<dyn AmbientContext>,
}

impl FieldResolver {
    /// Resolver drawing fallback values from `context`.
    pub fn new(context: Arc<dyn AmbientContext>) -> Self {
        Self { context }
    }

    /// Complete `acc` in place.
    ///
    /// Stages run in order and stop at the first missing field:
    /// session and command (no fallback), then user and module, then object
    /// type (defaults to `"P"`) and object id. A zero timestamp is replaced
    /// with the current time once every stage has passed.
    pub fn resolve(&self, acc: &mut UsageAccumulator) -> Result<(), SkipReason> {
        self.check_basic(acc)?;
        self.resolve_actor(acc)?;
        self.resolve_object(acc)?;

        if acc.timestamp() == 0 {
            acc.set_timestamp(now_millis());
        }
        Ok(())
    }

    fn check_basic(&self, acc: &UsageAccumulator) -> Result<(), SkipReason> {
        if is_blank(acc.session_id()) {
            return Err(skip(SkipReason::SessionId, acc));
        }
        if is_blank(acc.command()) {
            return Err(skip(SkipReason::Command, acc));
        }
        Ok(())
    }

    fn resolve_actor(&self, acc: &mut UsageAccumulator) -> Result<(), SkipReason> {
        if is_blank(acc.user_id()) {
            acc.set_user_id(self.context.current_user_id());
            debug!(user_id = ?acc.user_id(), "user_id taken from ambient context");
        }
        if is_blank(acc.user_id()) {
            return Err(skip(SkipReason::UserId, acc));
        }

        if is_blank(acc.module_id()) {
            acc.set_module_id(self.context.current_module_id());
            debug!(module_id = ?acc.module_id(), "module_id taken from ambient context");
        }
        if is_blank(acc.module_id()) {
            return Err(skip(SkipReason::ModuleId, acc));
        }
        Ok(())
    }

    fn resolve_object(&self, acc: &mut UsageAccumulator) -> Result<(), SkipReason> {
        if is_blank(acc.object_type()) {
            let object_type = self
                .context
                .current_process_type()
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_OBJECT_TYPE.to_string());
            acc.set_object_type(Some(object_type));
        }
        if is_blank(acc.object_id()) {
            acc.set_object_id(self.context.current_process_id());
            debug!(object_id = ?acc.object_id(), "object_id taken from ambient context");
        }

        if is_blank(acc.object_id()) {
            return Err(skip(SkipReason::ObjectId, acc));
        }
        Ok(())
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, str::is_empty)
}

fn skip(reason: SkipReason, acc: &UsageAccumulator) -> SkipReason {
    error!(
        field = reason.field(),
        session_id = ?acc.session_id(),
        command = ?acc.command(),
        module_id = ?acc.module_id(),
        "usage audit skipped: {reason}"
    );
    reason
}
