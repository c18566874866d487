//! Static event schema
//!
//! Describes the queryable shape of an [`Event`](feedhook_protocol::Event)
//! for expression validation: object fields map directly, and the `payload`
//! field is a union whose branches are the event kinds. The schema is built
//! once from the static event definitions and cached for the process
//! lifetime; validation never inspects a concrete event instance.

use std::collections::HashMap;
use std::sync::OnceLock;

use feedhook_protocol::EventType;

use crate::error::FilterError;
use crate::query::{Field, Selection};

/// Shape of one schema field
#[derive(Debug)]
pub enum FieldKind {
    /// Leaf value (string, number, array of scalars); selections cannot
    /// descend further
    Scalar,

    /// Nested object with a fixed field set
    Object(HashMap<&'static str, FieldKind>),

    /// Tagged union over the event kinds
    Union(UnionSchema),
}

/// Union node: one branch per event kind, plus the shared `kind` tag
#[derive(Debug)]
pub struct UnionSchema {
    branches: HashMap<EventType, HashMap<&'static str, FieldKind>>,
}

impl UnionSchema {
    /// Look up a field across the tag and all branches
    fn lookup(&self, name: &str) -> Option<&FieldKind> {
        if name == "kind" {
            return Some(&FieldKind::Scalar);
        }
        self.branches.values().find_map(|fields| fields.get(name))
    }
}

/// Queryable schema for the event root
#[derive(Debug)]
pub struct Schema {
    root: HashMap<&'static str, FieldKind>,
}

impl Schema {
    /// Validate a parsed selection against this schema
    ///
    /// # Errors
    ///
    /// [`FilterError::UnknownField`] naming the offending field and where it
    /// was looked up.
    pub fn validate(&self, selection: &Selection) -> Result<(), FilterError> {
        validate_fields(selection, &self.root, "event")
    }
}

fn validate_fields(
    selection: &Selection,
    fields: &HashMap<&'static str, FieldKind>,
    context: &str,
) -> Result<(), FilterError> {
    for field in selection.fields() {
        let kind = fields
            .get(field.name())
            .ok_or_else(|| FilterError::unknown_field(field.name(), context))?;
        validate_children(field, kind)?;
    }
    Ok(())
}

fn validate_children(field: &Field, kind: &FieldKind) -> Result<(), FilterError> {
    let Some(children) = field.children() else {
        return Ok(());
    };

    match kind {
        FieldKind::Scalar => {
            // Any child of a leaf is unknown by definition
            let first = &children.fields()[0];
            Err(FilterError::unknown_field(
                first.name(),
                format!("scalar field '{}'", field.name()),
            ))
        }
        FieldKind::Object(fields) => {
            validate_fields(children, fields, &format!("field '{}'", field.name()))
        }
        FieldKind::Union(union) => {
            for child in children.fields() {
                let child_kind = union.lookup(child.name()).ok_or_else(|| {
                    FilterError::unknown_field(
                        child.name(),
                        format!("union field '{}'", field.name()),
                    )
                })?;
                validate_children(child, child_kind)?;
            }
            Ok(())
        }
    }
}

/// The process-wide event schema
pub fn schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(build_schema)
}

/// Build the schema from the static event-message definitions
///
/// Kept in one place so a payload change fails the schema tests loudly
/// rather than silently widening or narrowing the filter surface.
fn build_schema() -> Schema {
    let mut branches: HashMap<EventType, HashMap<&'static str, FieldKind>> = HashMap::new();

    branches.insert(
        EventType::ChainRegistration,
        leaf_fields(&["chain_id", "entry_hash", "external_ids", "content"]),
    );
    branches.insert(
        EventType::EntryRegistration,
        leaf_fields(&["chain_id", "entry_hash"]),
    );
    branches.insert(
        EventType::EntryContentRegistration,
        leaf_fields(&["chain_id", "entry_hash", "external_ids", "content"]),
    );
    branches.insert(
        EventType::BlockCommit,
        leaf_fields(&["block_height", "block_hash", "entry_count"]),
    );
    branches.insert(
        EventType::ProcessMessage,
        leaf_fields(&["level", "code", "text"]),
    );
    branches.insert(
        EventType::NodeMessage,
        leaf_fields(&["level", "code", "text"]),
    );

    let mut root = HashMap::new();
    root.insert("source", FieldKind::Scalar);
    root.insert("timestamp", FieldKind::Scalar);
    root.insert("payload", FieldKind::Union(UnionSchema { branches }));

    Schema { root }
}

fn leaf_fields(names: &[&'static str]) -> HashMap<&'static str, FieldKind> {
    names.iter().map(|n| (*n, FieldKind::Scalar)).collect()
}
