use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::path::DocumentPath;

/// Document field map as stored: string keys to JSON values.
pub type Fields = Map<String, Value>;

/// A document as returned to callers: the stored fields plus the injected
/// `id` (final path segment) and `path` (full joined address).
///
/// Serializes flat -- `{"id": …, "path": …, <fields…>}` -- so the injected
/// fields shadow any stored fields of the same name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// The document's own name.
    pub id: String,
    /// The full delimiter-joined address.
    pub path: String,
    /// The stored payload.
    #[serde(flatten)]
    pub fields: Fields,
}

impl Record {
    /// Attach `id`/`path` from a document path to a raw field map.
    pub fn new(path: &DocumentPath, fields: Fields) -> Self {
        Self {
            id: path.document_id().to_string(),
            path: path.as_str().to_string(),
            fields,
        }
    }

    /// Look up a stored field by name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}
