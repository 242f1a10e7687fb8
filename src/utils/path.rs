//! absolute path splitting
//!
//! Only global paths are supported: every path starts at the root `/`.
use smallvec::SmallVec;

use crate::error::{FsError, Result};
use crate::fs::MAX_NAME_LEN;

/// path components below the root, most paths are shallow
pub type Components<'a> = SmallVec<[&'a str; 8]>;

/// split an absolute path into its components below the root
/// # Example
/// ```
/// use imagefs::utils::path::split_path;
/// assert!(split_path("/").unwrap().is_empty());
/// assert_eq!(split_path("/what/the/f").unwrap().as_slice(), &["what", "the", "f"]);
/// assert!(split_path("relative").is_err());
/// ```
pub fn split_path(path: &str) -> Result<Components<'_>> {
    let Some(rest) = path.strip_prefix('/') else {
        return Err(FsError::invalid_path(path, "only absolute paths are supported"));
    };
    if rest.is_empty() {
        return Ok(Components::new());
    }
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    rest.split('/')
        .map(|segment| {
            if segment.is_empty() {
                Err(FsError::invalid_path(path, "empty path segment"))
            } else {
                Ok(segment)
            }
        })
        .collect()
}

/// split a path into the components of its parent directory and its last name
///
/// The last name is validated as a new entry name.
pub fn split_parent(path: &str) -> Result<(Components<'_>, &str)> {
    let mut components = split_path(path)?;
    let name = components
        .pop()
        .ok_or_else(|| FsError::invalid_path(path, "the root directory has no name"))?;
    validate_name(path, name)?;
    Ok((components, name))
}

/// check that `name` fits an inode's name buffer
pub fn validate_name(path: &str, name: &str) -> Result<()> {
    if name == "." || name == ".." {
        return Err(FsError::invalid_path(path, format!("{name:?} is reserved")));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(FsError::invalid_path(
            path,
            format!("the name length must be less than {}", MAX_NAME_LEN + 1),
        ));
    }
    if name.bytes().any(|b| b == 0) {
        return Err(FsError::invalid_path(path, "names cannot contain NUL"));
    }
    Ok(())
}
