//! Safe source-archive extraction.
//!
//! Unpacks gzip-compressed or plain tar archives while guarding against:
//! - Path traversal (`../` components) and absolute paths
//! - Links, device nodes and other non-regular entries
//! - Excessive entry counts and extracted sizes

use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;

use crate::error::FailureReason;

/// Maximum number of entries allowed in an archive.
const MAX_ENTRY_COUNT: usize = 10_000;

/// Maximum total extracted size (1 GiB).
const MAX_EXTRACTED_SIZE: u64 = 1024 * 1024 * 1024;

/// Gzip magic bytes.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

fn extract_error(message: impl Into<String>) -> FailureReason {
    FailureReason::Extract {
        message: message.into(),
    }
}

/// Extract `data` into `dest` and return the source root.
///
/// The source root is the single top-level directory when the archive has
/// exactly one (as GitHub release tarballs do), else `dest` itself.
///
/// # Errors
///
/// Returns [`FailureReason::Extract`] on decompression or archive errors,
/// unsafe entries, size limits, or an empty archive.
pub fn extract_archive(data: &[u8], dest: &Path) -> Result<PathBuf, FailureReason> {
    std::fs::create_dir_all(dest)
        .map_err(|e| extract_error(format!("failed to create {}: {e}", dest.display())))?;
    let dest = dest
        .canonicalize()
        .map_err(|e| extract_error(format!("failed to canonicalize destination: {e}")))?;

    let reader: Box<dyn Read + '_> = if data.starts_with(&GZIP_MAGIC) {
        Box::new(GzDecoder::new(data))
    } else {
        Box::new(Cursor::new(data))
    };
    let mut archive = Archive::new(reader);
    // Keep the permission bits (scripts must stay executable) but never
    // setuid/setgid from an archive.
    archive.set_preserve_permissions(false);

    let mut entry_count = 0usize;
    let mut total_size: u64 = 0;

    let entries = archive
        .entries()
        .map_err(|e| extract_error(format!("failed to read archive entries: {e}")))?;

    for entry_result in entries {
        let mut entry =
            entry_result.map_err(|e| extract_error(format!("failed to read archive entry: {e}")))?;

        let entry_type = entry.header().entry_type();
        if matches!(
            entry_type,
            tar::EntryType::XGlobalHeader | tar::EntryType::XHeader | tar::EntryType::GNULongName
        ) {
            continue;
        }

        entry_count = entry_count.saturating_add(1);
        if entry_count > MAX_ENTRY_COUNT {
            return Err(extract_error(format!(
                "archive exceeds maximum entry count ({MAX_ENTRY_COUNT})"
            )));
        }

        let entry_path = entry
            .path()
            .map_err(|e| extract_error(format!("failed to read entry path: {e}")))?
            .into_owned();

        if !matches!(entry_type, tar::EntryType::Regular | tar::EntryType::Directory) {
            return Err(extract_error(format!(
                "unsafe entry type {entry_type:?}: {}",
                entry_path.display()
            )));
        }

        let entry_size = entry
            .header()
            .size()
            .map_err(|e| extract_error(format!("failed to read entry size: {e}")))?;
        total_size = total_size.saturating_add(entry_size);
        if total_size > MAX_EXTRACTED_SIZE {
            return Err(extract_error(format!(
                "archive exceeds maximum extracted size ({MAX_EXTRACTED_SIZE} bytes)"
            )));
        }

        validate_entry_path(&entry_path)?;
        let target = dest.join(&entry_path);

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                extract_error(format!("failed to create directory {}: {e}", parent.display()))
            })?;
        }

        entry
            .unpack(&target)
            .map_err(|e| extract_error(format!("failed to unpack {}: {e}", entry_path.display())))?;
    }

    if entry_count == 0 {
        return Err(extract_error("archive is empty"));
    }

    source_root(&dest)
}

/// Reject absolute paths and any component that could escape the destination.
fn validate_entry_path(path: &Path) -> Result<(), FailureReason> {
    let escapes = path.is_absolute()
        || path.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::Prefix(_) | Component::RootDir
            )
        });
    if escapes {
        return Err(extract_error(format!(
            "path traversal in archive: {}",
            path.display()
        )));
    }
    Ok(())
}

/// The single top-level directory of `dest`, or `dest` itself.
fn source_root(dest: &Path) -> Result<PathBuf, FailureReason> {
    let mut children = std::fs::read_dir(dest)
        .map_err(|e| extract_error(format!("failed to list {}: {e}", dest.display())))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| extract_error(format!("failed to list {}: {e}", dest.display())))?;

    if children.len() == 1 && children[0].path().is_dir() {
        if let Some(only) = children.pop() {
            return Ok(only.path());
        }
    }
    Ok(dest.to_path_buf())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use super::*;
    use pretty_assertions::assert_eq;

    /// Build an in-memory tarball. Paths ending in `/` become directories;
    /// `mode` applies to files.
    pub(crate) fn tarball(entries: &[(&str, &[u8], u32)], gzip: bool) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for &(path, data, mode) in entries {
            let mut header = tar::Header::new_gnu();
            if path.ends_with('/') {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                header.set_mode(0o755);
            } else {
                header.set_size(data.len() as u64);
                header.set_mode(mode);
            }
            header.set_path(path).unwrap();
            header.set_cksum();
            builder.append(&header, data).unwrap();
        }
        let tar_data = builder.into_inner().unwrap();
        if !gzip {
            return tar_data;
        }
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
        encoder.write_all(&tar_data).unwrap();
        encoder.finish().unwrap()
    }

    /// Tarball with a raw name field, bypassing `tar::Header::set_path` checks.
    fn raw_tarball(name: &[u8], entry_type: u8) -> Vec<u8> {
        let mut header = [0u8; 512];
        header[..name.len()].copy_from_slice(name);
        header[100..108].copy_from_slice(b"0000644\0");
        header[124..136].copy_from_slice(b"00000000000\0");
        header[156] = entry_type;
        header[148..156].copy_from_slice(b"        ");
        let sum: u32 = header.iter().map(|&b| u32::from(b)).sum();
        header[148..156].copy_from_slice(format!("{sum:06o}\0 ").as_bytes());
        let mut data = header.to_vec();
        data.extend_from_slice(&[0u8; 1024]);
        data
    }

    #[test]
    fn extracts_gzip_with_single_root() {
        let data = tarball(
            &[
                ("tool-1.0/", b"", 0),
                ("tool-1.0/README", b"hello", 0o644),
                ("tool-1.0/bin/tool", b"#!/bin/sh\n", 0o755),
            ],
            true,
        );
        let dir = tempfile::tempdir().unwrap();
        let root = extract_archive(&data, &dir.path().join("src")).unwrap();
        assert!(root.ends_with("tool-1.0"));
        assert_eq!(std::fs::read(root.join("README")).unwrap(), b"hello");
        assert!(root.join("bin/tool").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn keeps_executable_bit() {
        use std::os::unix::fs::PermissionsExt;
        let data = tarball(&[("run.sh", b"#!/bin/sh\n", 0o4755)], true);
        let dir = tempfile::tempdir().unwrap();
        let root = extract_archive(&data, dir.path()).unwrap();
        let mode = std::fs::metadata(root.join("run.sh")).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
        assert_eq!(mode & 0o4000, 0, "setuid must not survive extraction");
    }

    #[test]
    fn plain_tar_with_multiple_roots() {
        let data = tarball(&[("a.txt", b"a", 0o644), ("b.txt", b"b", 0o644)], false);
        let dir = tempfile::tempdir().unwrap();
        let root = extract_archive(&data, dir.path()).unwrap();
        assert_eq!(root, dir.path().canonicalize().unwrap());
        assert!(root.join("a.txt").is_file());
    }

    #[test]
    fn rejects_parent_traversal() {
        let data = raw_tarball(b"../evil", b'0');
        let dir = tempfile::tempdir().unwrap();
        let err = extract_archive(&data, &dir.path().join("x")).unwrap_err();
        assert!(err.to_string().contains("path traversal"), "{err}");
        assert!(!dir.path().join("evil").exists());
    }

    #[test]
    fn rejects_symlinks() {
        let data = raw_tarball(b"link", b'2');
        let dir = tempfile::tempdir().unwrap();
        let err = extract_archive(&data, dir.path()).unwrap_err();
        assert!(err.to_string().contains("unsafe entry type"), "{err}");
    }

    #[test]
    fn rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_archive(&[0x1f, 0x8b, 0x00, 0x01, 0x02], dir.path()).unwrap_err();
        assert!(matches!(err, FailureReason::Extract { .. }));
    }

    #[test]
    fn rejects_empty_archive() {
        let data = tarball(&[], true);
        let dir = tempfile::tempdir().unwrap();
        let err = extract_archive(&data, dir.path()).unwrap_err();
        assert_eq!(err.to_string(), "extraction failed: archive is empty");
    }
}
