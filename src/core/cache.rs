use crate::utils::error::Result;
use crate::wsdl::{Definition, WsdlReader};
use crate::xml::XmlDocument;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};

/// Parsed documents and WSDL definitions keyed by absolute path.
///
/// Entries are never evicted or invalidated: a file edited after its first
/// parse keeps returning the old content for the lifetime of the cache. The
/// process-wide instance from [`ParseCache::global`] therefore assumes that
/// sources do not change during a run; tests inject a fresh cache instead.
#[derive(Debug, Default)]
pub struct ParseCache {
    documents: RwLock<HashMap<PathBuf, Arc<XmlDocument>>>,
    definitions: RwLock<HashMap<PathBuf, Arc<Definition>>>,
}

impl ParseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> Arc<ParseCache> {
        static GLOBAL: OnceLock<Arc<ParseCache>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(ParseCache::new())))
    }

    pub fn document(&self, path: &Path) -> Result<Arc<XmlDocument>> {
        if let Some(doc) = read_guard(&self.documents).get(path) {
            return Ok(Arc::clone(doc));
        }

        tracing::debug!("Parsing {}", path.display());
        let parsed = Arc::new(XmlDocument::from_file(path)?);
        let mut documents = write_guard(&self.documents);
        // a concurrent first parse may have won the race; keep its copy
        Ok(Arc::clone(documents.entry(path.to_path_buf()).or_insert(parsed)))
    }

    pub fn definition(&self, path: &Path, reader: &WsdlReader) -> Result<Arc<Definition>> {
        if let Some(def) = read_guard(&self.definitions).get(path) {
            return Ok(Arc::clone(def));
        }

        let doc = self.document(path)?;
        let parsed = Arc::new(reader.read(path, &doc)?);
        let mut definitions = write_guard(&self.definitions);
        Ok(Arc::clone(definitions.entry(path.to_path_buf()).or_insert(parsed)))
    }

    pub fn document_count(&self) -> usize {
        read_guard(&self.documents).len()
    }

    pub fn definition_count(&self) -> usize {
        read_guard(&self.definitions).len()
    }
}

// Poisoned locks are recovered: an insert never leaves a partial entry.
fn read_guard<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_guard<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
