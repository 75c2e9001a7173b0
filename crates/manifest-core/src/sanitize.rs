//! Manifest id sanitation for artifact file names

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Characters Windows rejects in file names
const RESERVED_WINDOWS_CHARS: &[char] = &[':', '/', '*', '?', '"', '<', '>', '|', '\\'];

/// Path rules of the filesystem artifacts are written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathStyle {
    /// Restrictive: reserved characters are replaced
    Windows,
    /// Permissive: ids are used as-is
    Posix,
}

impl PathStyle {
    /// Style of the filesystem this binary was built for
    #[inline]
    #[must_use]
    pub fn host() -> Self {
        if cfg!(windows) {
            PathStyle::Windows
        } else {
            PathStyle::Posix
        }
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        Self::host()
    }
}

/// Turn a manifest id into a file name stem
///
/// On [`PathStyle::Windows`] every reserved character becomes `-`.
#[must_use]
pub fn sanitize_manifest_id(manifest_id: &str, style: PathStyle) -> Cow<'_, str> {
    match style {
        PathStyle::Posix => Cow::Borrowed(manifest_id),
        PathStyle::Windows if !manifest_id.contains(RESERVED_WINDOWS_CHARS) => {
            Cow::Borrowed(manifest_id)
        }
        PathStyle::Windows => Cow::Owned(manifest_id.replace(RESERVED_WINDOWS_CHARS, "-")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn windows_replaces_reserved_characters() {
        assert_eq!(sanitize_manifest_id("a:b/c", PathStyle::Windows), "a-b-c");
        assert_eq!(
            sanitize_manifest_id(r#"x*y?z"<>|\"#, PathStyle::Windows),
            "x-y-z-----"
        );
    }

    #[test]
    fn posix_leaves_id_untouched() {
        assert_eq!(sanitize_manifest_id("a:b/c", PathStyle::Posix), "a:b/c");
    }

    #[test]
    fn clean_id_is_borrowed() {
        assert!(matches!(
            sanitize_manifest_id("plain-id-123", PathStyle::Windows),
            Cow::Borrowed(_)
        ));
    }

    proptest! {
        #[test]
        fn windows_output_has_no_reserved_chars(id in ".*") {
            let out = sanitize_manifest_id(&id, PathStyle::Windows);
            prop_assert!(!out.contains(RESERVED_WINDOWS_CHARS));
            prop_assert_eq!(out.chars().count(), id.chars().count());
        }

        #[test]
        fn posix_is_identity(id in ".*") {
            prop_assert_eq!(sanitize_manifest_id(&id, PathStyle::Posix), id.as_str());
        }
    }
}
