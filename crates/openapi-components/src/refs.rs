//! `$ref` resolution used while extracting routes.
//!
//! `openapiv3` models `$ref`s as `ReferenceOr<T>` without resolving them. This resolver handles:
//! - Local refs (`#/components/...`)
//! - File refs (`./common.yaml#/...`, `/abs/path/spec.yaml#/...`, `file:///...#/...`)
//!
//! File refs are resolved relative to the document that contains the `$ref`, so callers pass
//! the current [`DocId`] along. Remote (`http(s)://`) refs are rejected: extraction never
//! touches the network.

use crate::error::{OpenApiComponentsError, Result};
use openapiv3::{OpenAPI, ReferenceOr};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Identity of a document taking part in `$ref` resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocId {
    /// The root document when it has no file location (fetched from a URL or built in memory).
    Inline,
    /// A document on disk.
    File(PathBuf),
}

impl DocId {
    /// Document id for a root spec location.
    ///
    /// URL-loaded specs become [`DocId::Inline`]; only their local refs can be followed.
    ///
    /// # Errors
    ///
    /// Returns an error for a `file://` URL that cannot be converted into a path.
    pub fn for_location(spec_location: &str) -> Result<Self> {
        if spec_location.starts_with("http://") || spec_location.starts_with("https://") {
            return Ok(DocId::Inline);
        }
        if spec_location.starts_with("file://") {
            return file_url_to_doc(spec_location);
        }
        Ok(DocId::File(canonicalize_best_effort(PathBuf::from(
            spec_location,
        ))))
    }

    fn display(&self) -> String {
        match self {
            DocId::Inline => "<root>".to_string(),
            DocId::File(p) => p.display().to_string(),
        }
    }
}

fn file_url_to_doc(location: &str) -> Result<DocId> {
    let url = Url::parse(location).map_err(|e| {
        OpenApiComponentsError::OpenApi(format!("Invalid file URL '{location}': {e}"))
    })?;
    let path = url.to_file_path().map_err(|()| {
        OpenApiComponentsError::OpenApi(format!(
            "Invalid file URL (cannot convert to path): {location}"
        ))
    })?;
    Ok(DocId::File(canonicalize_best_effort(path)))
}

fn canonicalize_best_effort(path: PathBuf) -> PathBuf {
    std::fs::canonicalize(&path).unwrap_or(path)
}

#[derive(Debug)]
pub struct RefResolver {
    root_doc: DocId,
    docs: RwLock<HashMap<DocId, Arc<Value>>>,
}

impl RefResolver {
    /// Create a resolver seeded with the already-parsed root document.
    ///
    /// # Errors
    ///
    /// Returns an error if the root spec cannot be converted into JSON.
    pub fn new(root_doc: DocId, spec: &OpenAPI) -> Result<Self> {
        let root_value = serde_json::to_value(spec)?;
        let mut docs = HashMap::new();
        docs.insert(root_doc.clone(), Arc::new(root_value));
        Ok(Self {
            root_doc,
            docs: RwLock::new(docs),
        })
    }

    /// Resolver for a spec that only lives in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the spec cannot be converted into JSON.
    pub fn inline(spec: &OpenAPI) -> Result<Self> {
        Self::new(DocId::Inline, spec)
    }

    #[must_use]
    pub fn root_doc(&self) -> &DocId {
        &self.root_doc
    }

    /// Follow `r` until an inline item is reached.
    ///
    /// Returns the item together with the document it was found in, which is the base for any
    /// nested refs inside it.
    ///
    /// # Errors
    ///
    /// Returns an error on cyclic, remote, malformed or dangling refs, or if the target does
    /// not deserialize as `T`.
    pub fn resolve<T>(&self, current_doc: &DocId, r: &ReferenceOr<T>) -> Result<(DocId, T)>
    where
        T: Clone + DeserializeOwned,
    {
        let mut seen: HashSet<String> = HashSet::new();
        let mut doc = current_doc.clone();
        let mut cur: ReferenceOr<T> = r.clone();

        loop {
            match cur {
                ReferenceOr::Item(item) => return Ok((doc, item)),
                ReferenceOr::Reference { reference } => {
                    if !seen.insert(Self::canonical_ref_key(&doc, &reference)?) {
                        return Err(OpenApiComponentsError::OpenApi(format!(
                            "Cyclic $ref detected while resolving: {reference}",
                        )));
                    }

                    let (target_doc, value) = self.resolve_value(&doc, &reference)?;
                    cur = serde_json::from_value(value).map_err(|e| {
                        OpenApiComponentsError::OpenApi(format!(
                            "Referenced value '{reference}' (doc {}) has an unexpected shape: {e}",
                            target_doc.display(),
                        ))
                    })?;
                    doc = target_doc;
                }
            }
        }
    }

    /// Look up the raw JSON value a `$ref` string points at.
    ///
    /// # Errors
    ///
    /// Returns an error if the ref is remote or malformed, the target document cannot be read,
    /// or the JSON pointer does not exist.
    pub fn resolve_value(&self, current_doc: &DocId, reference: &str) -> Result<(DocId, Value)> {
        let (target_doc, pointer) = Self::parse_ref(current_doc, reference)?;
        let doc_value = self.load_doc(&target_doc)?;

        let selected = match pointer {
            Some(ptr) => doc_value.pointer(&ptr).cloned().ok_or_else(|| {
                OpenApiComponentsError::OpenApi(format!(
                    "Unresolved $ref '{reference}' (doc {}, missing pointer '{ptr}')",
                    target_doc.display(),
                ))
            })?,
            None => (*doc_value).clone(),
        };

        Ok((target_doc, selected))
    }

    fn parse_ref(current_doc: &DocId, reference: &str) -> Result<(DocId, Option<String>)> {
        let (doc_part, frag_part) = match reference.split_once('#') {
            Some((d, f)) => (d, Some(f)),
            None => (reference, None),
        };

        let target_doc = Self::resolve_doc(current_doc, doc_part)?;
        let ptr = match frag_part {
            Some("") | None => None,
            Some(frag) if frag.starts_with('/') => Some(frag.to_string()),
            Some(_) => {
                return Err(OpenApiComponentsError::OpenApi(format!(
                    "Unsupported $ref fragment (expected JSON pointer starting with '/'): {reference}",
                )));
            }
        };

        Ok((target_doc, ptr))
    }

    fn resolve_doc(current_doc: &DocId, doc_part: &str) -> Result<DocId> {
        if doc_part.is_empty() {
            return Ok(current_doc.clone());
        }
        if doc_part.starts_with("http://") || doc_part.starts_with("https://") {
            return Err(OpenApiComponentsError::OpenApi(format!(
                "Remote $ref '{doc_part}' is not supported",
            )));
        }
        if doc_part.starts_with("file://") {
            return file_url_to_doc(doc_part);
        }

        if Path::new(doc_part).is_absolute() {
            return Ok(DocId::File(canonicalize_best_effort(PathBuf::from(
                doc_part,
            ))));
        }
        match current_doc {
            DocId::File(base) => {
                let resolved = base
                    .parent()
                    .unwrap_or_else(|| Path::new("."))
                    .join(doc_part);
                Ok(DocId::File(canonicalize_best_effort(resolved)))
            }
            DocId::Inline => Err(OpenApiComponentsError::OpenApi(format!(
                "Relative $ref '{doc_part}' needs a spec loaded from a file",
            ))),
        }
    }

    fn canonical_ref_key(current_doc: &DocId, reference: &str) -> Result<String> {
        let (target_doc, pointer) = Self::parse_ref(current_doc, reference)?;
        let mut key = target_doc.display();
        if let Some(ptr) = pointer {
            key.push('#');
            key.push_str(&ptr);
        }
        Ok(key)
    }

    fn load_doc(&self, doc: &DocId) -> Result<Arc<Value>> {
        if let Some(v) = self.docs.read().get(doc).cloned() {
            return Ok(v);
        }

        let DocId::File(path) = doc else {
            return Err(OpenApiComponentsError::OpenApi(
                "Root document is not loaded".to_string(),
            ));
        };
        let content = std::fs::read_to_string(path).map_err(|e| {
            OpenApiComponentsError::OpenApi(format!(
                "Failed to read referenced file {}: {e}",
                path.display(),
            ))
        })?;
        // JSON is a subset of YAML.
        let parsed: Value = serde_yaml::from_str(&content).map_err(|e| {
            OpenApiComponentsError::OpenApi(format!(
                "Failed to parse referenced document {}: {e}",
                path.display(),
            ))
        })?;

        let parsed = Arc::new(parsed);
        self.docs.write().insert(doc.clone(), Arc::clone(&parsed));
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openapiv3::Parameter;
    use tempfile::tempdir;

    fn spec(yaml: &str) -> OpenAPI {
        serde_yaml::from_str(yaml).expect("valid spec")
    }

    const LOCAL: &str = r#"
openapi: "3.0.0"
info: { title: t, version: "1" }
components:
  parameters:
    Limit:
      name: limit
      in: query
      schema: { type: integer }
    Alias:
      $ref: '#/components/parameters/Limit'
    LoopA:
      $ref: '#/components/parameters/LoopB'
    LoopB:
      $ref: '#/components/parameters/LoopA'
paths: {}
"#;

    #[test]
    fn follows_local_ref_chains() {
        let resolver = RefResolver::inline(&spec(LOCAL)).unwrap();
        let r: ReferenceOr<Parameter> = ReferenceOr::ref_("#/components/parameters/Alias");
        let (_doc, p) = resolver.resolve(resolver.root_doc(), &r).unwrap();
        assert_eq!(p.parameter_data_ref().name, "limit");
    }

    #[test]
    fn detects_cycles() {
        let resolver = RefResolver::inline(&spec(LOCAL)).unwrap();
        let r: ReferenceOr<Parameter> = ReferenceOr::ref_("#/components/parameters/LoopA");
        let err = resolver.resolve(resolver.root_doc(), &r).unwrap_err();
        assert!(err.to_string().contains("Cyclic"));
    }

    #[test]
    fn rejects_remote_and_dangling_refs() {
        let resolver = RefResolver::inline(&spec(LOCAL)).unwrap();
        let remote: ReferenceOr<Parameter> =
            ReferenceOr::ref_("https://example.com/common.yaml#/components/parameters/X");
        assert!(resolver.resolve(resolver.root_doc(), &remote).is_err());

        let dangling: ReferenceOr<Parameter> =
            ReferenceOr::ref_("#/components/parameters/Nope");
        let err = resolver.resolve(resolver.root_doc(), &dangling).unwrap_err();
        assert!(err.to_string().contains("missing pointer"));
    }

    #[test]
    fn relative_file_refs_need_a_file_base() {
        let resolver = RefResolver::inline(&spec(LOCAL)).unwrap();
        let r: ReferenceOr<Parameter> = ReferenceOr::ref_("./common.yaml#/x");
        assert!(resolver.resolve(resolver.root_doc(), &r).is_err());
    }

    #[test]
    fn resolves_refs_relative_to_the_containing_file() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("shared")).unwrap();
        std::fs::write(
            dir.path().join("shared/params.yaml"),
            r"
Id:
  $ref: './more.yaml#/Real'
",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("shared/more.yaml"),
            r"
Real:
  name: id
  in: path
  required: true
  schema: { type: string }
",
        )
        .unwrap();

        let root_path = dir.path().join("root.yaml");
        let root = DocId::for_location(&root_path.display().to_string()).unwrap();
        let resolver = RefResolver::new(root, &spec(LOCAL)).unwrap();
        let r: ReferenceOr<Parameter> = ReferenceOr::ref_("./shared/params.yaml#/Id");
        let (doc, p) = resolver.resolve(resolver.root_doc(), &r).unwrap();

        assert_eq!(p.parameter_data_ref().name, "id");
        match doc {
            DocId::File(path) => assert!(path.ends_with("more.yaml")),
            DocId::Inline => panic!("expected a file document"),
        }
    }
}
