//! Archive extraction for release assets.
//!
//! Supports gzip-compressed tarballs and zip files. Entries are unpacked in
//! archive order, keeping the directory structure and the recorded Unix mode
//! bits. Entries whose path would land outside the destination are rejected.

use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};
use tracing::{debug, trace};

use crate::{Error, Result};

/// Mode applied to zip entries that carry no Unix permissions.
const DEFAULT_DIR_MODE: u32 = 0o755;

/// Container formats understood by [`extract`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// gzip-compressed tar (`.tar.gz`, `.tgz`).
    TarGz,
    /// zip (`.zip`).
    Zip,
}

impl ArchiveFormat {
    /// Determine the format from the archive's filename suffix.
    pub fn detect(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(Self::TarGz)
        } else if name.ends_with(".zip") {
            Ok(Self::Zip)
        } else {
            Err(Error::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    }
}

/// Strip a known archive suffix from a file name.
///
/// `tool_linux_amd64.tar.gz` becomes `tool_linux_amd64`. Names without a
/// known suffix are returned unchanged.
#[must_use]
pub fn strip_archive_suffix(name: &str) -> &str {
    [".tar.gz", ".tgz", ".zip"]
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .unwrap_or(name)
}

/// Extract `archive` into `dest`.
///
/// The destination is created if needed. On error, entries written so far
/// stay on disk; cleaning up is the caller's job.
pub fn extract(archive: &Path, dest: &Path) -> Result<()> {
    let format = ArchiveFormat::detect(archive)?;
    debug!(archive = %archive.display(), dest = %dest.display(), ?format, "Extracting archive");

    fs::create_dir_all(dest).map_err(|e| Error::io("create_dir_all", dest, e))?;

    match format {
        ArchiveFormat::TarGz => extract_tar_gz(archive, dest),
        ArchiveFormat::Zip => extract_zip(archive, dest),
    }
}

fn extract_tar_gz(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path).map_err(|e| Error::io("open", archive_path, e))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let entries = archive
        .entries()
        .map_err(|e| Error::extraction(archive_path, format!("failed to read tar: {e}")))?;

    for entry in entries {
        let mut entry = entry
            .map_err(|e| Error::extraction(archive_path, format!("failed to read tar entry: {e}")))?;

        let entry_path = entry
            .path()
            .map_err(|e| Error::extraction(archive_path, format!("invalid path in tar: {e}")))?
            .into_owned();
        let target = enclosed_join(dest, &entry_path)?;
        let mode = entry.header().mode().unwrap_or(DEFAULT_DIR_MODE);
        let entry_type = entry.header().entry_type();

        match entry_type {
            EntryType::Directory => {
                trace!(path = %target.display(), "Creating directory");
                create_dir(&target, mode)?;
            }
            EntryType::Regular | EntryType::Continuous => {
                trace!(path = %target.display(), "Creating file");
                create_parent(&target)?;
                let mut out = File::create(&target).map_err(|e| Error::io("create", &target, e))?;
                io::copy(&mut entry, &mut out).map_err(|e| {
                    Error::extraction(
                        archive_path,
                        format!("failed to write {}: {e}", entry_path.display()),
                    )
                })?;
                set_mode(&target, mode)?;
            }
            other => {
                debug!(path = %entry_path.display(), entry_type = ?other, "Skipping tar entry");
            }
        }
    }

    Ok(())
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path).map_err(|e| Error::io("open", archive_path, e))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::extraction(archive_path, format!("failed to open zip: {e}")))?;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| Error::extraction(archive_path, format!("failed to read zip entry: {e}")))?;

        let name = file.name().to_string();
        let relative = file.enclosed_name().ok_or_else(|| Error::UnsafeArchiveEntry {
            entry: name.clone(),
        })?;
        let target = enclosed_join(dest, &relative)?;

        if file.is_dir() {
            trace!(path = %target.display(), "Creating directory");
            create_dir(&target, file.unix_mode().unwrap_or(DEFAULT_DIR_MODE))?;
            continue;
        }

        trace!(path = %target.display(), "Creating file");
        create_parent(&target)?;
        let mut out = File::create(&target).map_err(|e| Error::io("create", &target, e))?;
        io::copy(&mut file, &mut out).map_err(|e| {
            Error::extraction(archive_path, format!("failed to write {name}: {e}"))
        })?;
        if let Some(mode) = file.unix_mode() {
            set_mode(&target, mode)?;
        }
    }

    Ok(())
}

/// Join an archive entry path onto `dest`, refusing anything that escapes it.
fn enclosed_join(dest: &Path, entry: &Path) -> Result<PathBuf> {
    let unsafe_entry = || Error::UnsafeArchiveEntry {
        entry: entry.display().to_string(),
    };

    let mut relative = PathBuf::new();
    for component in entry.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !relative.pop() {
                    return Err(unsafe_entry());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(unsafe_entry()),
        }
    }

    Ok(dest.join(relative))
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io("create_dir_all", parent, e))?;
    }
    Ok(())
}

#[cfg(unix)]
fn create_dir(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new()
        .recursive(true)
        .mode(mode & 0o7777)
        .create(path)
        .map_err(|e| Error::io("create_dir", path, e))
}

#[cfg(not(unix))]
fn create_dir(path: &Path, _mode: u32) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| Error::io("create_dir", path, e))
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
        .map_err(|e| Error::io("set_permissions", path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
