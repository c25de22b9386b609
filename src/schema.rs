//! Payload schemas.
//!
//! Every action (`initializeWorkItem`, `completeWorkItem`, ...) is bound to a
//! [`Schema`] that validates the caller-supplied payload before the
//! dispatcher lets it touch runtime state. This mirrors the teacher's
//! `RuleStorage`/`Rule` split: a small trait object boundary around a
//! concrete validation backend, so the execution core never has to know
//! which schema language was used to describe an action's payload.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{EngineError, Result};

/// Validates JSON payloads against some schema.
///
/// Implementations must be `Send + Sync` since action definitions are
/// shared across concurrently-dispatched calls via `Arc`.
pub trait Schema: Send + Sync {
    /// Validate `payload`, returning a human-readable list of violations
    /// on failure. An empty `Ok(())` means the payload is accepted.
    fn validate(&self, payload: &Value) -> std::result::Result<(), Vec<String>>;

    /// Whether this schema accepts every payload, including the absence of
    /// one (`Value::Null`). Used by the builder to skip validation
    /// round-trips for actions declared with [`EmptySchema`].
    fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Debug for dyn Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Schema(empty={})", self.is_empty())
    }
}

/// Parses a payload schema against `serde_json::Value`, then validates
/// with the `jsonschema` crate's compiled validator.
pub struct JsonSchema {
    compiled: jsonschema::JSONSchema,
}

impl JsonSchema {
    /// Compile a JSON Schema document. Fails if `document` is not a valid
    /// schema (not if payloads later fail validation against it).
    pub fn parse(document: &Value) -> Result<Self> {
        let compiled = jsonschema::JSONSchema::compile(document).map_err(|e| {
            EngineError::InvalidDefinition(format!("invalid JSON schema: {e}"))
        })?;
        Ok(JsonSchema { compiled })
    }

    pub fn from_arc(document: &Value) -> Result<Arc<dyn Schema>> {
        Ok(Arc::new(Self::parse(document)?))
    }
}

impl Schema for JsonSchema {
    fn validate(&self, payload: &Value) -> std::result::Result<(), Vec<String>> {
        self.compiled.validate(payload).map_err(|errors| {
            errors.map(|e| e.to_string()).collect::<Vec<_>>()
        })
    }
}

/// A schema that accepts any payload, including a missing one. Used for
/// actions that take no input, e.g. a dummy task's `startWorkItem`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySchema;

impl Schema for EmptySchema {
    fn validate(&self, _payload: &Value) -> std::result::Result<(), Vec<String>> {
        Ok(())
    }

    fn is_empty(&self) -> bool {
        true
    }
}

/// Validate `payload` against `schema`, converting a schema rejection into
/// an [`EngineError::InvalidPayload`] tagged with `action`.
pub fn validate_payload(schema: &dyn Schema, action: &str, payload: &Value) -> Result<()> {
    schema.validate(payload).map_err(|violations| EngineError::InvalidPayload {
        action: action.to_string(),
        reason: violations.join("; "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_schema_accepts_anything() {
        let schema = EmptySchema;
        assert!(schema.validate(&Value::Null).is_ok());
        assert!(schema.validate(&json!({"whatever": 1})).is_ok());
        assert!(schema.is_empty());
    }

    #[test]
    fn json_schema_rejects_missing_required_field() {
        let document = json!({
            "type": "object",
            "required": ["amount"],
            "properties": { "amount": { "type": "number" } }
        });
        let schema = JsonSchema::parse(&document).expect("schema compiles");
        assert!(schema.validate(&json!({"amount": 42})).is_ok());
        let err = validate_payload(&schema, "completeWorkItem", &json!({})).unwrap_err();
        assert!(matches!(err, EngineError::InvalidPayload { .. }));
    }
}
