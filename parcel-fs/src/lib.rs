//! Capability-based file helpers shared by the parcel crates.
//!
//! Paths are UTF-8 ([`camino`]) and every access goes through a `cap-std`
//! directory handle opened on the path's parent.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use std::io;
use std::path::Component;

/// Open the directory containing `path` and return it with the file name.
///
/// # Errors
///
/// Fails when `path` has no file name or its parent cannot be opened.
pub fn parent_dir_and_name(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::other(format!("{path} does not name a file")))?
        .to_owned();
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, name))
}

/// Read a whole UTF-8 text file.
///
/// # Errors
///
/// Fails when the file cannot be opened or is not valid UTF-8.
pub fn read_utf8_file(path: &Utf8Path) -> io::Result<String> {
    let (dir, name) = parent_dir_and_name(path)?;
    dir.read_to_string(name.as_str())
}

/// Whether `path` names an existing regular file.
///
/// A missing file or parent directory is reported as `false`.
///
/// # Errors
///
/// Fails on I/O errors other than "not found".
pub fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = match parent_dir_and_name(path) {
        Ok(found) => found,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    match dir.metadata(name.as_str()) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Create every missing directory above `path`.
///
/// # Errors
///
/// Fails when a directory cannot be created.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() {
        return Ok(());
    }
    let (base, relative) = split_anchor(parent)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    base.create_dir_all(&relative)
}

/// Split `path` into an opened anchor directory and the remainder below it.
///
/// Absolute paths anchor at their root (and drive prefix on Windows);
/// relative paths anchor at the working directory.
///
/// # Errors
///
/// Fails when the anchor cannot be opened.
pub fn split_anchor(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let mut anchor = Utf8PathBuf::new();
    let mut relative = Utf8PathBuf::new();
    for component in path.as_std_path().components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| io::Error::other(format!("{path} is not valid UTF-8")))?;
        match component {
            Component::Prefix(_) | Component::RootDir => anchor.push(part),
            _ => relative.push(part),
        }
    }
    if anchor.as_str().is_empty() {
        anchor.push(".");
    }
    let dir = fs_utf8::Dir::open_ambient_dir(&anchor, ambient_authority())?;
    Ok((dir, relative))
}
