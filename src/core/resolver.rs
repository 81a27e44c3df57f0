use crate::core::cache::ParseCache;
use crate::utils::error::{DeployError, Result};
use crate::wsdl::{Definition, WsdlReader};
use crate::xml::{ns, Element, XmlDocument};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    ProcessDefinition,
    InterfaceDefinition,
    Schema,
}

impl DocumentKind {
    /// Classification depends only on the namespace of the root element.
    pub fn classify(namespace: Option<&str>) -> Option<Self> {
        match namespace? {
            ns::BPEL => Some(DocumentKind::ProcessDefinition),
            ns::WSDL => Some(DocumentKind::InterfaceDefinition),
            ns::XML_SCHEMA => Some(DocumentKind::Schema),
            _ => None,
        }
    }
}

/// Every file reachable from a process definition through imports, split by
/// dialect. Ordered by path so that everything derived from it is stable.
#[derive(Debug, Clone, Default)]
pub struct DependencyClosure {
    pub processes: BTreeMap<PathBuf, Arc<XmlDocument>>,
    pub interfaces: BTreeMap<PathBuf, Arc<Definition>>,
    pub schemas: BTreeSet<PathBuf>,
}

impl DependencyClosure {
    pub fn contains(&self, path: &Path) -> bool {
        self.kind_of(path).is_some()
    }

    pub fn kind_of(&self, path: &Path) -> Option<DocumentKind> {
        if self.processes.contains_key(path) {
            Some(DocumentKind::ProcessDefinition)
        } else if self.interfaces.contains_key(path) {
            Some(DocumentKind::InterfaceDefinition)
        } else if self.schemas.contains(path) {
            Some(DocumentKind::Schema)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.processes.len() + self.interfaces.len() + self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Interface definitions in path order.
    pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
        self.interfaces.values().map(|d| d.as_ref())
    }
}

/// One branch of the import query: a child-element path from the document
/// root and the attribute holding the location.
struct ImportPath {
    steps: &'static [(&'static str, &'static str)],
    attribute: &'static str,
}

// xsd:import/@schemaLocation | wsdl:import/@location | bpel:import/@location
//   | wsdl:types/xsd:schema/xsd:import/@schemaLocation
const IMPORT_QUERY: [ImportPath; 4] = [
    ImportPath {
        steps: &[(ns::XML_SCHEMA, "import")],
        attribute: "schemaLocation",
    },
    ImportPath {
        steps: &[(ns::WSDL, "import")],
        attribute: "location",
    },
    ImportPath {
        steps: &[(ns::BPEL, "import")],
        attribute: "location",
    },
    ImportPath {
        steps: &[
            (ns::WSDL, "types"),
            (ns::XML_SCHEMA, "schema"),
            (ns::XML_SCHEMA, "import"),
        ],
        attribute: "schemaLocation",
    },
];

/// Import locations declared by a document, in query then document order.
pub fn import_locations(root: &Element) -> Vec<String> {
    let mut locations = Vec::new();
    for query in &IMPORT_QUERY {
        let mut current = vec![root];
        for (namespace, local) in query.steps {
            current = current
                .into_iter()
                .flat_map(|e| e.children_named(namespace, local))
                .collect();
        }
        locations.extend(
            current
                .into_iter()
                .filter_map(|e| e.attribute(query.attribute))
                .map(str::to_string),
        );
    }
    locations
}

pub struct DependencyResolver {
    cache: Arc<ParseCache>,
    reader: &'static WsdlReader,
    search_dirs: Vec<PathBuf>,
}

impl DependencyResolver {
    pub fn new(cache: Arc<ParseCache>) -> Self {
        Self {
            cache,
            reader: WsdlReader::shared(),
            search_dirs: Vec::new(),
        }
    }

    pub fn with_reader(cache: Arc<ParseCache>, reader: &'static WsdlReader) -> Self {
        Self {
            cache,
            reader,
            search_dirs: Vec::new(),
        }
    }

    /// Directory searched by base name when an import does not exist at its
    /// relative location, as in an archive where all imports sit flat under
    /// `wsdl/`.
    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dirs.push(dir.into());
        self
    }

    /// Follows imports from `root` and classifies every reachable file.
    ///
    /// Each file is visited once no matter how many import paths reach it,
    /// which also makes cyclic imports terminate.
    pub fn resolve(&self, root: &Path) -> Result<DependencyClosure> {
        let mut closure = DependencyClosure::default();
        let mut pending = vec![canonical(root)?];

        while let Some(path) = pending.pop() {
            if closure.contains(&path) {
                continue;
            }

            let doc = self.cache.document(&path)?;
            let element = doc.root();
            match DocumentKind::classify(element.namespace()) {
                Some(DocumentKind::ProcessDefinition) => {
                    closure.processes.insert(path.clone(), Arc::clone(&doc));
                }
                Some(DocumentKind::InterfaceDefinition) => {
                    let definition = self.cache.definition(&path, self.reader)?;
                    closure.interfaces.insert(path.clone(), definition);
                }
                Some(DocumentKind::Schema) => {
                    closure.schemas.insert(path.clone());
                }
                None => {
                    return Err(DeployError::UnknownNamespace {
                        path,
                        namespace: element.namespace().unwrap_or_default().to_string(),
                    })
                }
            }

            let base = path.parent().unwrap_or_else(|| Path::new("/"));
            for location in import_locations(element) {
                if let Some(dependency) = resolve_location(base, &location, &self.search_dirs)? {
                    tracing::debug!("{} imports {}", path.display(), dependency.display());
                    pending.push(dependency);
                }
            }
        }

        tracing::debug!(
            "Resolved {} process, {} WSDL and {} schema files",
            closure.processes.len(),
            closure.interfaces.len(),
            closure.schemas.len()
        );
        Ok(closure)
    }
}

fn canonical(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path).map_err(|e| {
        DeployError::IoError(std::io::Error::new(
            e.kind(),
            format!("Cannot resolve {}: {}", path.display(), e),
        ))
    })
}

fn resolve_location(base: &Path, location: &str, search_dirs: &[PathBuf]) -> Result<Option<PathBuf>> {
    let location = location.trim();
    let location = match location.strip_prefix("file://") {
        Some(local) => local,
        None if location.contains("://") => {
            tracing::warn!("⚠️ Skipping remote import {}", location);
            return Ok(None);
        }
        None => location,
    };

    let candidate = Path::new(location);
    let path = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    };
    if !path.exists() {
        let found = candidate
            .file_name()
            .and_then(|name| search_dirs.iter().map(|d| d.join(name)).find(|p| p.is_file()));
        if let Some(found) = found {
            return canonical(&found).map(Some);
        }
    }
    canonical(&path).map(Some)
}
