//! Filesystem utilities for the compile/patch pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Kind of a file encountered during directory enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Php,
    Bak,
    Xml,
    Other,
}

/// A classified directory entry. Enumeration and classification happen
/// before any processing so the set of files acted upon is deterministic.
#[derive(Debug, Clone)]
pub struct DirFile {
    pub kind: FileKind,
    pub path: PathBuf,
}

/// Enumerate the files of `dir` (non-recursive), classify by extension,
/// and return them sorted by file name.
pub fn classify_dir(dir: &Path) -> Result<Vec<DirFile>, Error> {
    let entries = fs::read_dir(dir).map_err(|e| Error::Read {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::Read {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let kind = match path.extension().and_then(|e| e.to_str()) {
            Some("php") => FileKind::Php,
            Some("bak") => FileKind::Bak,
            Some("xml") => FileKind::Xml,
            _ => FileKind::Other,
        };
        files.push(DirFile { kind, path });
    }

    files.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(files)
}

/// Recursively collect all file paths under `dir`, sorted.
pub fn walk_files(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let entries = fs::read_dir(&current).map_err(|e| Error::Read {
            path: current.clone(),
            source: e,
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::Read {
                path: current.clone(),
                source: e,
            })?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Read a file into a string.
pub fn read_file(path: &Path) -> Result<String, Error> {
    fs::read_to_string(path).map_err(|e| Error::Read {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write content to a file, creating parent directories if needed.
///
/// The content is written to a sibling temp file first and renamed into
/// place, so an interrupted run never leaves a half-written artifact.
pub fn write_file<C: AsRef<[u8]>>(path: &Path, contents: C) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        create_dir_idempotent(parent)?;
    }

    let tmp = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => path.with_file_name(format!("{}.tmp", name)),
        None => path.with_extension("tmp"),
    };
    fs::write(&tmp, contents).map_err(|e| Error::Write {
        path: tmp.clone(),
        source: e,
    })?;
    fs::rename(&tmp, path).map_err(|e| Error::Rename {
        from: tmp,
        to: path.to_path_buf(),
        source: e,
    })
}

/// Create a directory tree, treating "already exists" as success.
pub fn create_dir_idempotent(dir: &Path) -> Result<(), Error> {
    fs::create_dir_all(dir).map_err(|e| Error::CreateDir {
        path: dir.to_path_buf(),
        source: e,
    })
}

/// Delete a file.
pub fn remove_file(path: &Path) -> Result<(), Error> {
    fs::remove_file(path).map_err(|e| Error::Remove {
        path: path.to_path_buf(),
        source: e,
    })
}
