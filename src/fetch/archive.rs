//! Archive extraction with strip-components semantics
//!
//! Supports gzip or xz compressed tarballs, plain tarballs and zip files,
//! detected from the leading bytes. Every entry is resolved lexically below
//! the destination; entries and symlinks that climb out of it are rejected.

use std::ffi::OsStr;
use std::fs;
use std::io::{self, BufReader, Cursor, Read, Seek};
use std::path::{Component, Path, PathBuf};

use flate2::read::MultiGzDecoder;
use tempfile::NamedTempFile;
use tracing::debug;
use xz2::read::XzDecoder;
use zip::ZipArchive;

use crate::error::FetchError;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const XZ_MAGIC: &[u8] = &[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00];
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    TarXz,
    Tar,
    Zip,
}

impl ArchiveFormat {
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(GZIP_MAGIC) {
            Self::TarGz
        } else if bytes.starts_with(XZ_MAGIC) {
            Self::TarXz
        } else if bytes.starts_with(ZIP_MAGIC) {
            Self::Zip
        } else {
            Self::Tar
        }
    }
}

/// Extract `bytes` into `dir`, dropping `strip` leading path components
pub fn extract_archive(bytes: &[u8], dir: &Path, strip: usize) -> Result<(), FetchError> {
    extract_reader(Cursor::new(bytes), dir, strip)
}

/// Extract the archive stored at `path` without loading it into memory
pub fn extract_archive_file(path: &Path, dir: &Path, strip: usize) -> Result<(), FetchError> {
    let file = fs::File::open(path)
        .map_err(|e| FetchError::io(format!("opening {}", path.display()), e))?;
    extract_reader(BufReader::new(file), dir, strip)
}

fn extract_reader<R: Read + Seek>(
    mut reader: R,
    dir: &Path,
    strip: usize,
) -> Result<(), FetchError> {
    fs::create_dir_all(dir)
        .map_err(|e| FetchError::io(format!("creating directory {}", dir.display()), e))?;

    let mut magic = Vec::with_capacity(XZ_MAGIC.len());
    (&mut reader)
        .take(XZ_MAGIC.len() as u64)
        .read_to_end(&mut magic)
        .map_err(|e| FetchError::io("reading archive header", e))?;
    reader
        .rewind()
        .map_err(|e| FetchError::io("rewinding archive", e))?;

    let format = ArchiveFormat::detect(&magic);
    debug!(
        "Extracting {:?} archive into {} (strip {})",
        format,
        dir.display(),
        strip
    );

    match format {
        ArchiveFormat::TarGz => extract_tar(MultiGzDecoder::new(reader), dir, strip),
        ArchiveFormat::TarXz => extract_tar(XzDecoder::new(reader), dir, strip),
        ArchiveFormat::Tar => extract_tar(reader, dir, strip),
        ArchiveFormat::Zip => extract_zip(reader, dir, strip),
    }
}

/// Temporary file an archive is downloaded into before extraction. The
/// returned async handle writes to the same file and is deleted with it.
pub(crate) fn spool_file() -> Result<(NamedTempFile, tokio::fs::File), FetchError> {
    let temp = NamedTempFile::new().map_err(|e| FetchError::io("creating download file", e))?;
    let file = temp
        .reopen()
        .map_err(|e| FetchError::io("opening download file", e))?;
    Ok((temp, tokio::fs::File::from_std(file)))
}

fn corrupt(e: impl std::fmt::Display) -> FetchError {
    FetchError::CorruptArchive(e.to_string())
}

fn extract_tar<R: Read>(reader: R, dir: &Path, strip: usize) -> Result<(), FetchError> {
    let mut archive = tar::Archive::new(reader);
    let mut seen = 0usize;
    let mut written = 0usize;

    for entry in archive.entries().map_err(corrupt)? {
        let mut entry = entry.map_err(corrupt)?;
        seen += 1;

        let entry_type = entry.header().entry_type();
        if entry_type.is_pax_global_extensions()
            || entry_type.is_pax_local_extensions()
            || entry_type.is_gnu_longname()
            || entry_type.is_gnu_longlink()
        {
            continue;
        }

        let path = entry.path().map_err(corrupt)?.into_owned();
        let Some(target) = destination(dir, &path, strip, entry_type.is_dir())? else {
            continue;
        };

        if entry_type.is_dir() {
            fs::create_dir_all(&target).map_err(|e| {
                FetchError::io(format!("creating directory {}", target.display()), e)
            })?;
        } else if entry_type.is_hard_link() {
            let link = entry
                .link_name()
                .map_err(corrupt)?
                .ok_or_else(|| corrupt(format!("hard link {} has no target", path.display())))?
                .into_owned();
            let Some(source) = destination(dir, &link, strip, false)? else {
                return Err(FetchError::PathTraversal(link.display().to_string()));
            };
            create_parent(&target)?;
            fs::hard_link(&source, &target).map_err(|e| {
                FetchError::io(
                    format!("linking {} to {}", target.display(), source.display()),
                    e,
                )
            })?;
        } else if entry_type.is_symlink() || entry_type.is_file() {
            if entry_type.is_symlink() {
                let link = entry
                    .link_name()
                    .map_err(corrupt)?
                    .ok_or_else(|| corrupt(format!("symlink {} has no target", path.display())))?;
                check_symlink(dir, &target, &link)?;
            }
            create_parent(&target)?;
            entry
                .unpack(&target)
                .map_err(|e| unpack_error(&target, e))?;
        } else {
            return Err(corrupt(format!(
                "unsupported entry type {:?} for {}",
                entry_type,
                path.display()
            )));
        }
        written += 1;
    }

    finish(seen, written, strip)
}

fn extract_zip<R: Read + Seek>(reader: R, dir: &Path, strip: usize) -> Result<(), FetchError> {
    let mut archive = ZipArchive::new(reader).map_err(corrupt)?;
    let mut written = 0usize;

    for index in 0..archive.len() {
        let mut file = archive.by_index(index).map_err(corrupt)?;
        let path = file
            .enclosed_name()
            .map(Path::to_path_buf)
            .ok_or_else(|| FetchError::PathTraversal(file.name().to_string()))?;
        let Some(target) = destination(dir, &path, strip, file.is_dir())? else {
            continue;
        };

        if file.is_dir() {
            fs::create_dir_all(&target).map_err(|e| {
                FetchError::io(format!("creating directory {}", target.display()), e)
            })?;
        } else {
            create_parent(&target)?;
            let mut out = fs::File::create(&target)
                .map_err(|e| FetchError::io(format!("creating {}", target.display()), e))?;
            io::copy(&mut file, &mut out)
                .map_err(|e| FetchError::io(format!("writing {}", target.display()), e))?;
            #[cfg(unix)]
            if let Some(mode) = file.unix_mode() {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o7777)).map_err(
                    |e| FetchError::io(format!("setting mode of {}", target.display()), e),
                )?;
            }
        }
        written += 1;
    }

    finish(archive.len(), written, strip)
}

/// A stream that ends early or fails to decode mid-entry is a corrupt archive
fn unpack_error(target: &Path, e: io::Error) -> FetchError {
    match e.kind() {
        io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput => {
            corrupt(format!("extracting {}: {}", target.display(), e))
        }
        _ => FetchError::io(format!("extracting {}", target.display()), e),
    }
}

fn finish(seen: usize, written: usize, strip: usize) -> Result<(), FetchError> {
    if seen == 0 {
        return Err(FetchError::CorruptArchive(
            "archive contains no entries".to_string(),
        ));
    }
    if written == 0 && strip > 0 {
        return Err(FetchError::StripComponents(strip));
    }
    Ok(())
}

/// Push the components of `path` onto `parts`, returning false if `..`
/// climbs above the start
fn push_components<'a>(parts: &mut Vec<&'a OsStr>, path: &'a Path) -> bool {
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return false;
                }
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    true
}

/// Resolve where an entry lands below `root`.
///
/// Returns `None` for directories that are stripped away entirely. A file
/// with no components left after stripping is an error.
fn destination(
    root: &Path,
    path: &Path,
    strip: usize,
    is_dir: bool,
) -> Result<Option<PathBuf>, FetchError> {
    let mut parts = Vec::new();
    if !push_components(&mut parts, path) {
        return Err(FetchError::PathTraversal(path.display().to_string()));
    }

    if parts.len() <= strip {
        return match (is_dir, strip) {
            (true, _) => Ok(None),
            (false, 0) => Err(corrupt(format!("entry {:?} has no name", path.display()))),
            (false, _) => Err(FetchError::StripComponents(strip)),
        };
    }

    Ok(Some(parts[strip..].iter().fold(root.to_path_buf(), |acc, part| acc.join(part))))
}

/// Reject symlinks whose target is absolute or resolves outside `root`
fn check_symlink(root: &Path, target: &Path, link: &Path) -> Result<(), FetchError> {
    let relative = target.strip_prefix(root).unwrap_or(target);
    let mut parts: Vec<&OsStr> = Vec::new();
    let absolute = link
        .components()
        .any(|c| matches!(c, Component::RootDir | Component::Prefix(_)));
    let escapes = absolute
        || !push_components(&mut parts, relative)
        || parts.pop().is_none()
        || !push_components(&mut parts, link);
    if escapes {
        return Err(FetchError::PathTraversal(format!(
            "{} -> {}",
            target.display(),
            link.display()
        )));
    }
    Ok(())
}

fn create_parent(target: &Path) -> Result<(), FetchError> {
    match target.parent() {
        Some(parent) => fs::create_dir_all(parent)
            .map_err(|e| FetchError::io(format!("creating directory {}", parent.display()), e)),
        None => Ok(()),
    }
}

/// Remove everything inside `dir`, keeping (or creating) the directory itself
pub fn clear_dir(dir: &Path) -> io::Result<()> {
    if !dir.exists() {
        return fs::create_dir_all(dir);
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}
