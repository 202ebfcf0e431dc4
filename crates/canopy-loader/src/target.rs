use canopy_types::{CollectionPath, CollectionPathTemplate, DocumentPath, PathResult};

/// Where a write will land.
///
/// `Exact` when the caller supplied a full document selector; `Generated`
/// when the selector stopped one level short, so the store mints the
/// document name under the addressed collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteTarget {
    /// The caller named the document: write at this exact path.
    Exact(DocumentPath),
    /// The caller named a collection: write under a store-generated name.
    Generated(CollectionPath),
}

/// Resolve the write target for `doc_names` against `template`.
///
/// A full-length selector resolves to `Exact`; anything else falls back
/// to collection resolution, so a selector of any other wrong length
/// fails with `CollectionNameCount`. Delimiter violations propagate from
/// name validation in either branch and never fall back.
pub fn resolve_write_target(
    template: &CollectionPathTemplate,
    doc_names: &[&str],
) -> PathResult<WriteTarget> {
    if doc_names.len() == template.depth() {
        Ok(WriteTarget::Exact(template.document_path(doc_names)?))
    } else {
        Ok(WriteTarget::Generated(template.collection_path(doc_names)?))
    }
}
