//! Mutable event state assembled before a record is finalized.

use serde::Serialize;
use serde_json::{Map, Value};
use telemetry_types::{now_millis, AuditRecord};
use uuid::Uuid;

/// Attributes of one usage event, collected over the life of an operation.
///
/// Setters store values as given. Completeness is checked later by
/// [`FieldResolver`](crate::FieldResolver).
#[derive(Debug, Clone, PartialEq)]
pub struct UsageAccumulator {
    instance_id: Uuid,
    user_id: Option<String>,
    session_id: Option<String>,
    object_id: Option<String>,
    module_id: Option<String>,
    command: Option<String>,
    classname: Option<String>,
    object_type: Option<String>,
    timestamp: i64,
    metadata: Value,
}

impl Default for UsageAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageAccumulator {
    /// Fresh accumulator with an empty metadata object, stamped now.
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            user_id: None,
            session_id: None,
            object_id: None,
            module_id: None,
            command: None,
            classname: None,
            object_type: None,
            timestamp: now_millis(),
            metadata: Value::Object(Map::new()),
        }
    }

    /// Identity of this instance, distinct for every accumulator created.
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Actor responsible for the event.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Overwrite `user_id`; `None` clears it.
    pub fn set_user_id(&mut self, user_id: Option<impl Into<String>>) {
        self.user_id = user_id.map(Into::into);
    }

    /// Session the event belongs to.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Overwrite `session_id`; `None` clears it.
    pub fn set_session_id(&mut self, session_id: Option<impl Into<String>>) {
        self.session_id = session_id.map(Into::into);
    }

    /// Identifier of the entity acted upon.
    pub fn object_id(&self) -> Option<&str> {
        self.object_id.as_deref()
    }

    /// Overwrite `object_id`; `None` clears it.
    pub fn set_object_id(&mut self, object_id: Option<impl Into<String>>) {
        self.object_id = object_id.map(Into::into);
    }

    /// Owning functional module.
    pub fn module_id(&self) -> Option<&str> {
        self.module_id.as_deref()
    }

    /// Overwrite `module_id`; `None` clears it.
    pub fn set_module_id(&mut self, module_id: Option<impl Into<String>>) {
        self.module_id = module_id.map(Into::into);
    }

    /// Action name.
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// Overwrite `command`; `None` clears it.
    pub fn set_command(&mut self, command: Option<impl Into<String>>) {
        self.command = command.map(Into::into);
    }

    /// Originating component, for diagnostics.
    pub fn classname(&self) -> Option<&str> {
        self.classname.as_deref()
    }

    /// Overwrite `classname`; `None` clears it.
    pub fn set_classname(&mut self, classname: Option<impl Into<String>>) {
        self.classname = classname.map(Into::into);
    }

    /// Category of the acted-upon entity.
    pub fn object_type(&self) -> Option<&str> {
        self.object_type.as_deref()
    }

    /// Overwrite `object_type`; `None` clears it.
    pub fn set_object_type(&mut self, object_type: Option<impl Into<String>>) {
        self.object_type = object_type.map(Into::into);
    }

    /// Event time in epoch milliseconds. Zero means unset.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Overwrite the event time.
    pub fn set_timestamp(&mut self, millis: i64) {
        self.timestamp = millis;
    }

    /// Free-form event payload.
    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    /// Replace the whole metadata blob.
    pub fn set_metadata(&mut self, metadata: Value) {
        self.metadata = metadata;
    }

    /// Add one metadata entry.
    ///
    /// Values that cannot be serialized are dropped. If the blob was replaced
    /// with something other than an object it is reset to an empty object
    /// first.
    pub fn put_metadata(&mut self, key: impl Into<String>, value: impl Serialize) {
        let Ok(value) = serde_json::to_value(value) else {
            return;
        };
        if !self.metadata.is_object() {
            self.metadata = Value::Object(Map::new());
        }
        if let Value::Object(entries) = &mut self.metadata {
            entries.insert(key.into(), value);
        }
    }

    /// Immutable record carrying the current values.
    pub fn snapshot(&self) -> AuditRecord {
        let mut builder = AuditRecord::builder()
            .timestamp(self.timestamp)
            .metadata(self.metadata.clone());

        if let Some(user_id) = &self.user_id {
            builder = builder.user_id(user_id.as_str());
        }
        if let Some(session_id) = &self.session_id {
            builder = builder.session_id(session_id.as_str());
        }
        if let Some(object_id) = &self.object_id {
            builder = builder.object_id(object_id.as_str());
        }
        if let Some(module_id) = &self.module_id {
            builder = builder.module_id(module_id.as_str());
        }
        if let Some(command) = &self.command {
            builder = builder.command(command.as_str());
        }
        if let Some(classname) = &self.classname {
            builder = builder.classname(classname.as_str());
        }
        if let Some(object_type) = &self.object_type {
            builder = builder.object_type(object_type.as_str());
        }

        builder.build()
    }
}
