//! Entry name validation.
//!
//! Valid entry names:
//! - Must be non-empty
//! - Must not be `.` or `..`
//! - Must not contain `/` or NUL

use crate::error::{BranchError, BranchResult};

/// Characters that are forbidden anywhere in an entry name.
const FORBIDDEN_CHARS: &[char] = &['/', '\0'];

/// Validate a single path component, returning `Ok(())` if it may name a
/// tree entry.
///
/// # Examples
///
/// ```
/// use vine_branch::validate_name;
///
/// assert!(validate_name("notes.txt").is_ok());
/// assert!(validate_name("..").is_err());
/// assert!(validate_name("a/b").is_err());
/// ```
pub fn validate_name(name: &str) -> BranchResult<()> {
    if name.is_empty() {
        return Err(BranchError::InvalidArgument(
            "entry name must not be empty".into(),
        ));
    }

    if name == "." || name == ".." {
        return Err(BranchError::InvalidArgument(format!(
            "entry name must not be {name:?}"
        )));
    }

    if let Some(ch) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(BranchError::InvalidArgument(format!(
            "{name:?} contains forbidden character {ch:?}"
        )));
    }

    Ok(())
}

/// Render path components for messages and logs.
pub fn display_path<S: AsRef<str>>(path: &[S]) -> String {
    let mut out = String::new();
    for component in path {
        out.push('/');
        out.push_str(component.as_ref());
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}
