//! Filtering engine
//!
//! Projects a subset of an event's JSON for one subscription. Each
//! subscription supplies a filter expression per event type; the expression
//! is a selection set over the event's shape:
//!
//! ```text
//! source payload { chain_id external_ids }
//! ```
//!
//! A field followed by `{ ... }` selects the named children; a bare field
//! selects its whole subtree. The empty expression is the identity
//! transform: the full event JSON.
//!
//! Expressions are validated against a static schema of the event's
//! tagged-union shape (built once, see [`schema::schema`]), so an unknown
//! field is rejected even when the concrete event instance would simply not
//! carry it. Selected fields that the event's variant does not carry are
//! omitted from the projection.
//!
//! Evaluation errors are returned to the caller; the router skips only the
//! affected subscription and leaves the rest of the fan-out untouched.

mod error;
mod query;
mod schema;

pub use error::FilterError;
pub use query::{Field, Selection};
pub use schema::{schema, FieldKind, Schema, UnionSchema};

use feedhook_protocol::Event;
use serde_json::Value;

/// Produce the JSON bytes to deliver for `event` under `expression`
///
/// An empty (or all-whitespace) expression serializes the whole event.
///
/// # Errors
///
/// [`FilterError::Syntax`] for a malformed expression,
/// [`FilterError::UnknownField`] for a field the event shape does not have.
pub fn project(event: &Event, expression: &str) -> Result<Vec<u8>, FilterError> {
    if expression.trim().is_empty() {
        return Ok(serde_json::to_vec(event)?);
    }

    let selection = Selection::parse(expression)?;
    schema().validate(&selection)?;

    let value = serde_json::to_value(event)?;
    let projected = apply(&selection, &value);
    Ok(serde_json::to_vec(&projected)?)
}

/// Apply a validated selection to a JSON value
///
/// Selected fields absent from the value (a different union branch) are
/// omitted; the result is always a strict subset of the input object.
fn apply(selection: &Selection, value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(selection.fields().len());
            for field in selection.fields() {
                if let Some(child) = map.get(field.name()) {
                    let projected = match field.children() {
                        Some(children) => apply(children, child),
                        None => child.clone(),
                    };
                    out.insert(field.name().to_string(), projected);
                }
            }
            Value::Object(out)
        }
        // Selections only descend through objects; anything else passes
        // through untouched (validation already rejected the expression
        // otherwise).
        other => other.clone(),
    }
}
