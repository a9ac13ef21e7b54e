use std::path::{Component, Path, PathBuf};

use crate::error::{DepotError, Result};

/// Join a manifest-relative filename onto `root`.
///
/// Manifests may use `\` as a separator. Absolute paths, drive prefixes and
/// `..` components are rejected so nothing lands outside `root`.
pub fn safe_join(root: &Path, rel: &str) -> Result<PathBuf> {
    let normalized = rel.replace('\\', "/");
    let mut out = root.to_path_buf();
    let mut pushed = false;
    for comp in Path::new(&normalized).components() {
        match comp {
            Component::Normal(part) => {
                out.push(part);
                pushed = true;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(DepotError::UnsafePath(rel.to_string()));
            }
        }
    }
    if !pushed {
        return Err(DepotError::UnsafePath(rel.to_string()));
    }
    Ok(out)
}
