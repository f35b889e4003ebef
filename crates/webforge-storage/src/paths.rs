// Path validation for user-supplied names and relative paths

use std::path::{Component, Path, PathBuf};

use crate::error::{Result, StorageError};

/// Validate a single directory/file name (project or model name)
pub fn validate_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\', '\0'])
    {
        return Err(StorageError::invalid_path(format!("'{name}' is not a valid name")));
    }
    Ok(trimmed)
}

/// Validate a path relative to a project root.
///
/// Rejects absolute paths, `..` components and NUL bytes; `.` components are dropped.
pub fn validate_relative_path(path: &str) -> Result<PathBuf> {
    if path.contains('\0') {
        return Err(StorageError::invalid_path("path contains NUL byte"));
    }

    let mut clean = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(StorageError::invalid_path(format!(
                    "'{path}' escapes the project directory"
                )))
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(StorageError::invalid_path(format!("'{path}' is absolute")))
            }
        }
    }

    if clean.as_os_str().is_empty() {
        return Err(StorageError::invalid_path("path is empty"));
    }
    Ok(clean)
}

/// Render a relative path with forward slashes
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_relative_path() {
        assert_eq!(
            validate_relative_path("public/index.html").unwrap(),
            PathBuf::from("public/index.html")
        );
        assert_eq!(
            validate_relative_path("./a/./b.txt").unwrap(),
            PathBuf::from("a/b.txt")
        );
        assert!(validate_relative_path("../etc/passwd").is_err());
        assert!(validate_relative_path("a/../../b").is_err());
        assert!(validate_relative_path("/etc/passwd").is_err());
        assert!(validate_relative_path("").is_err());
        assert!(validate_relative_path(".").is_err());
        assert!(validate_relative_path("a\0b").is_err());
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name(" site ").unwrap(), "site");
        assert!(validate_name("..").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("").is_err());
    }

    #[test]
    fn test_to_slash() {
        assert_eq!(to_slash(Path::new("a/b/c.txt")), "a/b/c.txt");
    }
}
