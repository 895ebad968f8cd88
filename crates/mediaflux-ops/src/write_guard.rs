//! Pre-flight write-protection check.

use std::fs;
use std::path::Path;

use mediaflux_core::EngineError;

/// Report the first write-protected candidate, or `None` if all candidates
/// are writable.
///
/// Empty paths are skipped; non-existent entries are skipped too, since
/// non-existence is not a write-protection failure. Deterministic,
/// side-effect free, early exit on the first offender. The `action` label
/// ends up in the error message ("'…' is write-protected. 'Delete' is not
/// possible.").
pub fn first_write_protected<'a, I>(action: &str, candidates: I) -> Option<EngineError>
where
    I: IntoIterator<Item = &'a Path>,
{
    for path in candidates {
        if path.as_os_str().is_empty() {
            continue;
        }
        let Ok(metadata) = fs::metadata(path) else {
            continue;
        };
        if metadata.permissions().readonly() {
            return Some(EngineError::write_protected(path, action));
        }
    }
    None
}
