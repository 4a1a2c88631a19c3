//! File-system collaborator.
//!
//! The engine needs exactly two primitives from the outside world: a
//! directory glob and an existence check. They are behind a trait so search
//! logic stays deterministic and testable; [`DiskFileSystem`] is the real
//! implementation used by default.

use crate::error::{Error, Result};
use std::path::Path;

/// Narrow interface to the directory tree searched by the resolver.
///
/// Implementations must be shareable across threads; the engine holds no
/// other state between calls.
pub trait FileSystem: Send + Sync {
    /// Expand a pattern containing `*` wildcards into the literal paths that
    /// exist on disk. Wildcards never cross a `/` separator.
    fn glob(&self, pattern: &str) -> Result<Vec<String>>;

    /// Whether a literal path exists.
    fn exists(&self, path: &str) -> bool;
}

/// [`FileSystem`] backed by the real disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskFileSystem;

impl FileSystem for DiskFileSystem {
    fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        let entries = glob::glob(pattern)
            .map_err(|e| Error::Configuration(format!("invalid glob pattern '{pattern}': {e}")))?;
        let mut out = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) => out.push(path.to_string_lossy().into_owned()),
                Err(e) => return Err(Error::Io(e.into_error())),
            }
        }
        Ok(out)
    }

    fn exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn disk_glob_lists_only_matching_entries() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_string_lossy().into_owned();
        for name in ["a.exr", "b.exr", "c.mov"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let fs = DiskFileSystem;
        let mut hits = fs.glob(&format!("{root}/*.exr")).unwrap();
        hits.sort();
        assert_eq!(hits, [format!("{root}/a.exr"), format!("{root}/b.exr")]);

        assert!(fs.exists(&format!("{root}/c.mov")));
        assert!(!fs.exists(&format!("{root}/d.mov")));
    }
}
