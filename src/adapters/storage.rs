use crate::utils::error::Result;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A deployment archive as a directory tree on disk.
///
/// A directory is used in place. A zip archive is unpacked into a scratch
/// directory that lives as long as the mount; rewrites only ever touch that
/// copy.
#[derive(Debug)]
pub enum ArchiveMount {
    Directory(PathBuf),
    Unpacked { archive: PathBuf, scratch: TempDir },
}

impl ArchiveMount {
    pub fn open(archive: &Path, scratch_parent: Option<&Path>) -> Result<Self> {
        if archive.is_dir() {
            tracing::debug!("📁 Using {} as an unpacked archive", archive.display());
            return Ok(ArchiveMount::Directory(archive.to_path_buf()));
        }

        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "archive".to_string());
        let mut builder = tempfile::Builder::new();
        builder.prefix(&name).suffix("-unpacked");
        let scratch = match scratch_parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };

        unpack(archive, scratch.path())?;
        tracing::debug!("📁 Unpacked {} into {}", archive.display(), scratch.path().display());

        Ok(ArchiveMount::Unpacked {
            archive: archive.to_path_buf(),
            scratch,
        })
    }

    /// Root of the tree.
    pub fn root(&self) -> &Path {
        match self {
            ArchiveMount::Directory(dir) => dir,
            ArchiveMount::Unpacked { scratch, .. } => scratch.path(),
        }
    }

    pub fn archive(&self) -> &Path {
        match self {
            ArchiveMount::Directory(dir) => dir,
            ArchiveMount::Unpacked { archive, .. } => archive,
        }
    }

    pub fn is_unpacked(&self) -> bool {
        matches!(self, ArchiveMount::Unpacked { .. })
    }
}

fn unpack(archive: &Path, dest: &Path) -> Result<()> {
    let mut zip = zip::ZipArchive::new(std::fs::File::open(archive)?)?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        // entries escaping the destination are skipped
        let outpath = match entry.enclosed_name() {
            Some(path) => dest.join(path),
            None => continue,
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath)?;
            continue;
        }
        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut buffer = Vec::new();
        entry.read_to_end(&mut buffer)?;
        std::fs::File::create(&outpath)?.write_all(&buffer)?;
    }
    Ok(())
}
