//! Reasons a path could not be dated.

/// Why a relative path did not yield a valid date.
///
/// Every variant is per-file and non-fatal: the scanner counts the file as
/// "bad", logs it with its relative path, and leaves it out of the catalog.
///
/// # Examples
///
/// ```
/// use pdx_dates::{PathDateResolver, Unresolved};
///
/// let resolver = PathDateResolver::with_max_year(2027);
/// assert_eq!(resolver.resolve_path("file.pdf").unwrap_err(), Unresolved::Malformed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Unresolved {
    /// The path has no directory component.
    #[error("path has no directory component")]
    Malformed,

    /// No naming convention matched the directory segments.
    #[error("no date convention matched the directory names")]
    NoPattern,

    /// A convention matched but the values failed range validation.
    #[error("inferred date {year}-{month}-{day} is out of range")]
    OutOfRange {
        /// Inferred year.
        year: i32,
        /// Inferred month.
        month: u32,
        /// Inferred day.
        day: u32,
    },
}

impl Unresolved {
    /// Short machine-friendly label for logs and reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::NoPattern => "no_pattern",
            Self::OutOfRange { .. } => "out_of_range",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_display() {
        let err = Unresolved::OutOfRange {
            year: 1850,
            month: 7,
            day: 19,
        };
        assert!(err.to_string().contains("1850-7-19"));
        assert_eq!(err.label(), "out_of_range");
    }

    #[test]
    fn test_labels() {
        assert_eq!(Unresolved::Malformed.label(), "malformed");
        assert_eq!(Unresolved::NoPattern.label(), "no_pattern");
    }
}
