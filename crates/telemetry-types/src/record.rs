//! Finalized usage audit record.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Object type written when neither the caller nor the ambient context
/// supplies one ("P" = process).
pub const DEFAULT_OBJECT_TYPE: &str = "P";

/// One tracked usage event, ready to be persisted.
///
/// Records are only created through [`AuditRecordBuilder`]. The builder does
/// not validate, so any field left unset is `None` here; records produced by
/// the field resolver always carry every mandatory field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    user_id: Option<String>,
    session_id: Option<String>,
    object_id: Option<String>,
    module_id: Option<String>,
    command: Option<String>,
    classname: Option<String>,
    object_type: Option<String>,
    timestamp: Option<i64>,
    metadata: Option<Value>,
}

impl AuditRecord {
    /// Create a new record builder.
    pub fn builder() -> AuditRecordBuilder {
        AuditRecordBuilder::new()
    }

    /// Actor responsible for the event.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Session the event belongs to.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Identifier of the entity acted upon.
    pub fn object_id(&self) -> Option<&str> {
        self.object_id.as_deref()
    }

    /// Owning functional module.
    pub fn module_id(&self) -> Option<&str> {
        self.module_id.as_deref()
    }

    /// Action name.
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// Originating component, for diagnostics.
    pub fn classname(&self) -> Option<&str> {
        self.classname.as_deref()
    }

    /// Category of the acted-upon entity.
    pub fn object_type(&self) -> Option<&str> {
        self.object_type.as_deref()
    }

    /// Event time in milliseconds since the Unix epoch.
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    /// Free-form event payload.
    pub fn metadata(&self) -> Option<&Value> {
        self.metadata.as_ref()
    }

    /// Timestamp rendered the way the store binds it (a numeric string).
    pub fn timestamp_text(&self) -> Option<String> {
        self.timestamp.map(|millis| millis.to_string())
    }

    /// Metadata serialized for storage, pretty-printed with two-space indent.
    pub fn metadata_text(&self) -> Option<String> {
        self.metadata
            .as_ref()
            .and_then(|value| serde_json::to_string_pretty(value).ok())
    }
}

/// Builder for [`AuditRecord`].
#[derive(Debug, Default, Clone)]
pub struct AuditRecordBuilder {
    user_id: Option<String>,
    session_id: Option<String>,
    object_id: Option<String>,
    module_id: Option<String>,
    command: Option<String>,
    classname: Option<String>,
    object_type: Option<String>,
    timestamp: Option<i64>,
    metadata: Option<Value>,
}

impl AuditRecordBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user ID.
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the session ID.
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set the object ID.
    pub fn object_id(mut self, object_id: impl Into<String>) -> Self {
        self.object_id = Some(object_id.into());
        self
    }

    /// Set the module ID.
    pub fn module_id(mut self, module_id: impl Into<String>) -> Self {
        self.module_id = Some(module_id.into());
        self
    }

    /// Set the command.
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Set the originating class name.
    pub fn classname(mut self, classname: impl Into<String>) -> Self {
        self.classname = Some(classname.into());
        self
    }

    /// Set the object type.
    pub fn object_type(mut self, object_type: impl Into<String>) -> Self {
        self.object_type = Some(object_type.into());
        self
    }

    /// Set the event time (milliseconds since the Unix epoch).
    pub fn timestamp(mut self, millis: i64) -> Self {
        self.timestamp = Some(millis);
        self
    }

    /// Set the metadata payload.
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Build the record.
    pub fn build(self) -> AuditRecord {
        AuditRecord {
            user_id: self.user_id,
            session_id: self.session_id,
            object_id: self.object_id,
            module_id: self.module_id,
            command: self.command,
            classname: self.classname,
            object_type: self.object_type,
            timestamp: self.timestamp,
            metadata: self.metadata,
        }
    }
}
