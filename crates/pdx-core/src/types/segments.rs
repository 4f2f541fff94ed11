//! Relative file paths split into directory segments.

use smallvec::SmallVec;

/// A normalized relative file path: its directory segments plus the filename.
///
/// Normalization converts backslashes to forward slashes, trims whitespace
/// around the whole path and drops empty segments. Segments themselves keep
/// their spelling on disk, padding included, since they form the catalog
/// key. A path needs at least one
/// directory segment to be resolvable; a bare filename is rejected.
///
/// # Examples
///
/// ```
/// use pdx_core::PathSegments;
///
/// let segments = PathSegments::parse("\\2025\\07\\19\\x.pdf").unwrap();
/// assert_eq!(segments.dirs(), ["2025", "07", "19"]);
/// assert_eq!(segments.file_name(), "x.pdf");
/// assert_eq!(segments.normalized(), "2025/07/19/x.pdf");
///
/// assert!(PathSegments::parse("file.pdf").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSegments {
    dirs: SmallVec<[String; 6]>,
    file_name: String,
}

impl PathSegments {
    /// Splits a relative path, returning `None` when it has no directory
    /// component.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = Self::normalize(raw);
        let mut parts: SmallVec<[String; 6]> = normalized.split('/').map(str::to_owned).collect();
        if parts.len() < 2 {
            return None;
        }
        let file_name = parts.pop()?;
        Some(Self {
            dirs: parts,
            file_name,
        })
    }

    /// Normalizes a raw relative path to forward slashes without empty
    /// segments.
    ///
    /// ```
    /// use pdx_core::PathSegments;
    ///
    /// assert_eq!(PathSegments::normalize(" /a//b\\c.pdf/ "), "a/b/c.pdf");
    /// ```
    #[must_use]
    pub fn normalize(raw: &str) -> String {
        raw.trim()
            .replace('\\', "/")
            .split('/')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Directory segments, root first, filename excluded.
    #[inline]
    #[must_use]
    pub fn dirs(&self) -> &[String] {
        &self.dirs
    }

    /// The trailing filename.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The normalized relative path, used as the catalog key.
    #[must_use]
    pub fn normalized(&self) -> String {
        let mut out = self.dirs.join("/");
        out.push('/');
        out.push_str(&self.file_name);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric_layout() {
        let segments = PathSegments::parse("2025/07/19/x.pdf").unwrap();
        assert_eq!(segments.dirs().len(), 3);
        assert_eq!(segments.file_name(), "x.pdf");
    }

    #[test]
    fn test_parse_keeps_inner_spaces() {
        let segments =
            PathSegments::parse("HEMATOLOGIA 2026/ENERO 2026/30 ENERO/informe final.pdf").unwrap();
        assert_eq!(segments.dirs(), ["HEMATOLOGIA 2026", "ENERO 2026", "30 ENERO"]);
        assert_eq!(segments.file_name(), "informe final.pdf");
    }

    #[test]
    fn test_parse_rejects_root_file() {
        assert!(PathSegments::parse("file.pdf").is_none());
        assert!(PathSegments::parse("/file.pdf/").is_none());
        assert!(PathSegments::parse("").is_none());
    }

    #[test]
    fn test_normalized_roundtrip() {
        let segments = PathSegments::parse("a\\b\\c.pdf").unwrap();
        assert_eq!(segments.normalized(), "a/b/c.pdf");
    }

    #[test]
    fn test_inner_segment_padding_is_kept() {
        let segments = PathSegments::parse(" ENERO 2026/ 30 ENERO/x.pdf \n").unwrap();
        assert_eq!(segments.dirs(), ["ENERO 2026", " 30 ENERO"]);
        assert_eq!(segments.normalized(), "ENERO 2026/ 30 ENERO/x.pdf");
    }
}
