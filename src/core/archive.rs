use crate::core::cache::ParseCache;
use crate::core::descriptors::{
    self, CatalogEntry, BPEL_DIR, CATALOG_ENTRY, PROCESS_DESCRIPTOR_ENTRY, WSDL_DIR,
};
use crate::core::partner_links::{PartnerLinkResolver, PartnerRoleLookup};
use crate::core::resolver::{DependencyClosure, DependencyResolver};
use crate::domain::model::PartnerLink;
use crate::utils::error::{DeployError, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zip::write::{FileOptions, ZipWriter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub role_lookup: PartnerRoleLookup,
    pub catalog_entry: CatalogEntry,
}

/// Serialized descriptors of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDescriptors {
    pub catalog: Vec<u8>,
    pub process_descriptor: Vec<u8>,
}

/// 封存檔建置結果
#[derive(Debug, Clone)]
pub struct ArchiveManifest {
    pub archive: PathBuf,
    pub entries: Vec<String>,
    pub partner_links: Vec<PartnerLink>,
}

/// Packs a process definition, its WSDL and XSD dependencies and the two
/// generated descriptors into a `.bpr` archive.
pub struct ArchiveBuilder {
    cache: Arc<ParseCache>,
    options: BuildOptions,
}

impl ArchiveBuilder {
    pub fn new(cache: Arc<ParseCache>) -> Self {
        Self {
            cache,
            options: BuildOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(&self, process_file: &Path, output: &Path) -> Result<ArchiveManifest> {
        tracing::info!("📦 Building {} from {}", output.display(), process_file.display());
        self.try_build(process_file, output)
            .map_err(|e| e.into_archive_generation(format!("could not generate {}", output.display())))
    }

    /// Descriptors only, without touching the output archive.
    pub fn generate_descriptors(&self, process_file: &Path) -> Result<GeneratedDescriptors> {
        let (_, _, descriptors) = self.prepare(process_file)?;
        Ok(descriptors)
    }

    fn prepare(
        &self,
        process_file: &Path,
    ) -> Result<(DependencyClosure, Vec<PartnerLink>, GeneratedDescriptors)> {
        tracing::debug!("Reading dependencies from {}", process_file.display());
        let closure = DependencyResolver::new(Arc::clone(&self.cache)).resolve(process_file)?;
        let root = std::fs::canonicalize(process_file)?;
        let process = closure
            .processes
            .get(&root)
            .ok_or_else(|| DeployError::malformed(&root, "not a BPEL process definition"))?;

        let partner_links = PartnerLinkResolver::new(&closure)
            .with_role_lookup(self.options.role_lookup)
            .resolve_all()?;

        tracing::debug!("Writing catalog.xml");
        let catalog = descriptors::file_catalog(&closure)?.to_pretty_bytes()?;
        tracing::debug!("Writing process.pdd");
        let process_descriptor =
            descriptors::process_descriptor(&root, process, &partner_links, &closure)?
                .to_pretty_bytes()?;

        Ok((
            closure,
            partner_links,
            GeneratedDescriptors {
                catalog,
                process_descriptor,
            },
        ))
    }

    fn try_build(&self, process_file: &Path, output: &Path) -> Result<ArchiveManifest> {
        let (closure, partner_links, generated) = self.prepare(process_file)?;
        let root = std::fs::canonicalize(process_file)?;

        let catalog = match self.options.catalog_entry {
            CatalogEntry::Catalog => &generated.catalog,
            CatalogEntry::ProcessDescriptor => &generated.process_descriptor,
        };

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut zip = ZipWriter::new(File::create(output)?);
        let mut entries = Vec::new();

        for path in closure.interfaces.keys().chain(closure.schemas.iter()) {
            let name = format!("{}/{}", WSDL_DIR, descriptors::file_name(path)?);
            add_entry(&mut zip, &name, &std::fs::read(path)?)?;
            entries.push(name);
        }
        add_entry(&mut zip, PROCESS_DESCRIPTOR_ENTRY, &generated.process_descriptor)?;
        entries.push(PROCESS_DESCRIPTOR_ENTRY.to_string());
        add_entry(&mut zip, CATALOG_ENTRY, catalog)?;
        entries.push(CATALOG_ENTRY.to_string());

        let bpel = format!("{}/{}", BPEL_DIR, descriptors::file_name(&root)?);
        add_entry(&mut zip, &bpel, &std::fs::read(&root)?)?;
        entries.push(bpel);

        zip.finish()?;
        tracing::info!("✅ Packed {} entries into {}", entries.len(), output.display());

        Ok(ArchiveManifest {
            archive: output.to_path_buf(),
            entries,
            partner_links,
        })
    }
}

fn add_entry<W: Write + std::io::Seek>(zip: &mut ZipWriter<W>, name: &str, content: &[u8]) -> Result<()> {
    zip.start_file::<_, ()>(name, FileOptions::default())?;
    zip.write_all(content)?;
    Ok(())
}
