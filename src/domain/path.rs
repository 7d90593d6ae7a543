use crate::error::ValidationError;

/// Split a repository-relative path into its `/`-separated segments.
///
/// Rejects the shapes no listing or change should ever carry: empty paths,
/// leading or trailing slashes and empty segments.
pub(crate) fn split_segments(path: &str) -> Result<Vec<&str>, ValidationError> {
    if path.is_empty() {
        return Err(ValidationError::EmptyPath);
    }

    let malformed = |reason| ValidationError::MalformedPath {
        path: path.to_string(),
        reason,
    };

    if path.starts_with('/') {
        return Err(malformed("leading slash"));
    }
    if path.ends_with('/') {
        return Err(malformed("trailing slash"));
    }

    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(malformed("empty segment"));
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_segments() {
        assert_eq!(split_segments("a").unwrap(), vec!["a"]);
        assert_eq!(split_segments("src/b/c.ts").unwrap(), vec!["src", "b", "c.ts"]);
    }

    #[test]
    fn test_split_segments_rejects_malformed() {
        assert_eq!(split_segments(""), Err(ValidationError::EmptyPath));
        for path in ["/a", "a/", "a//b"] {
            assert!(
                matches!(
                    split_segments(path),
                    Err(ValidationError::MalformedPath { .. })
                ),
                "{path} should be rejected"
            );
        }
    }
}
