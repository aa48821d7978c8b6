//! Vault-relative path helpers.
//!
//! Every path handed to the resolver, the coordinator or the region codec is a vault-relative,
//! `/`-separated string. The vault root folder is the empty string `""`. These helpers keep
//! conversions between that representation and OS paths in one place.
use std::{
    borrow::Cow,
    path::{Component, Path, PathBuf, MAIN_SEPARATOR_STR},
};

use crate::error::MocError;

pub const TRIM: char = '/';

pub fn os_path_to_string<P: AsRef<Path>>(os_path_ref: P) -> String {
    os_path_ref
        .as_ref()
        .components()
        .filter_map(|c| match c {
            Component::RootDir | Component::CurDir => None,
            _ => Some(c.as_os_str().to_string_lossy()),
        })
        .collect::<Vec<Cow<'_, str>>>()
        .join("/")
}

pub fn string_to_os_path(path_string: &str) -> PathBuf {
    PathBuf::from(path_string.replace('/', MAIN_SEPARATOR_STR))
}

/// Express `abs` relative to the vault `root`.
pub fn to_vault_path(root: &Path, abs: &Path) -> Result<String, MocError> {
    Ok(os_path_to_string(abs.strip_prefix(root)?))
}

/// The containing folder of `path`. The root (`""`) has no parent.
pub fn parent_path(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    match path.rfind(TRIM) {
        Some(idx) => Some(&path[..idx]),
        None => Some(""),
    }
}

pub fn file_name(path: &str) -> &str {
    match path.rfind(TRIM) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// File name without its final extension. Dot files keep their full name.
pub fn file_stem(path: &str) -> &str {
    let name = file_name(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

pub fn extension(path: &str) -> Option<&str> {
    let name = file_name(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 => Some(&name[idx + 1..]),
        _ => None,
    }
}

pub fn path_join(base: &str, end: &str) -> String {
    let base = base.trim_matches(TRIM);
    let end = end.trim_matches(TRIM);
    if base.is_empty() {
        end.to_string()
    } else if end.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{end}")
    }
}

/// True if `path` is `base` itself or lies beneath it. Everything lies beneath the root.
pub fn is_within(path: &str, base: &str) -> bool {
    if base.is_empty() {
        return true;
    }
    path == base
        || (path.len() > base.len()
            && path.starts_with(base)
            && path[base.len()..].starts_with(TRIM))
}

/// Replace the `old_base` prefix of `path` with `new_base`.
pub fn rebase(path: &str, old_base: &str, new_base: &str) -> Option<String> {
    if !is_within(path, old_base) {
        return None;
    }
    let rest = path[old_base.len()..].trim_start_matches(TRIM);
    Some(path_join(new_base, rest))
}

/// Path of `target` as seen from a document living in `from_folder`, using `..` segments
/// where the target is not beneath that folder.
pub fn relative_path(target: &str, from_folder: &str) -> String {
    let target_parts: Vec<&str> = target.split(TRIM).filter(|p| !p.is_empty()).collect();
    let from_parts: Vec<&str> = from_folder.split(TRIM).filter(|p| !p.is_empty()).collect();
    let shared = target_parts
        .iter()
        .zip(from_parts.iter())
        .take_while(|(a, b)| a == b)
        .count()
        // never consume the file name itself
        .min(target_parts.len().saturating_sub(1));
    let mut segments: Vec<&str> = vec![".."; from_parts.len() - shared];
    segments.extend_from_slice(&target_parts[shared..]);
    segments.join("/")
}
