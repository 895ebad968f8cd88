//! Rename destination resolution.

use std::fs;
use std::path::{Component, Path, PathBuf};

use mediaflux_core::EngineError;

/// Resolve the destination path for a rename of `source`.
///
/// `new_name` may be a plain name, a relative escape like `../sibling/name`,
/// or an absolute override. The joined path is normalized lexically; `..`
/// components that would climb past the filesystem root fail with
/// `EngineError::PathResolution`. Missing ancestor directories of the
/// destination are created as a side effect, so the subsequent rename can
/// land directly.
pub fn resolve_rename(source: &Path, new_name: &str) -> Result<PathBuf, EngineError> {
    if new_name.is_empty() {
        return Err(EngineError::path_resolution(source, "new name is empty"));
    }
    let parent = source
        .parent()
        .ok_or_else(|| EngineError::path_resolution(source, "source has no parent directory"))?;

    // Joining with an absolute new_name replaces the parent entirely.
    let destination = normalize(&parent.join(new_name))
        .ok_or_else(|| EngineError::path_resolution(source, "destination escapes the root"))?;

    if !destination.is_absolute() {
        return Err(EngineError::path_resolution(
            source,
            "destination is not an absolute path",
        ));
    }

    if let Some(ancestors) = destination.parent() {
        fs::create_dir_all(ancestors).map_err(|e| EngineError::io(ancestors, e))?;
    }

    Ok(destination)
}

/// Lexically normalize a path: resolve `.` and `..` without touching the
/// filesystem. Returns `None` if `..` climbs past the root.
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut resolved = PathBuf::new();
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::RootDir | Component::Prefix(_) => {
                resolved.push(component.as_os_str());
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                resolved.pop();
                depth -= 1;
            }
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
        }
    }
    Some(resolved)
}
