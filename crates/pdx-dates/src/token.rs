//! Date Token Parser.
//!
//! Classifies a single path segment by the date-shaped patterns it matches.
//! Matching happens on the [folded](fold) form of the segment: lowercased,
//! diacritics removed, whitespace collapsed.
//!
//! | Shape       | Example             | Yields                    |
//! |-------------|---------------------|---------------------------|
//! | Month Year  | `ENERO 2026`        | month, year               |
//! | Month Year  | `10. OCTUBRE 2025`  | month, year (ordinal)     |
//! | Day Month   | `30 ENERO`          | day, month                |
//! | Day Month   | `31 MAYO 2024`      | day, month, year          |
//! | Numeric     | `2025`, `07`, `9`   | year or month/day         |
//!
//! Unknown month names are not errors, they simply carry no signal.

use std::sync::OnceLock;

use regex::Regex;

/// Spanish month names after folding, including the `setiembre` variant.
const MONTHS: &[(&str, u32)] = &[
    ("enero", 1),
    ("febrero", 2),
    ("marzo", 3),
    ("abril", 4),
    ("mayo", 5),
    ("junio", 6),
    ("julio", 7),
    ("agosto", 8),
    ("septiembre", 9),
    ("setiembre", 9),
    ("octubre", 10),
    ("noviembre", 11),
    ("diciembre", 12),
];

/// Canonical upper-case month names used when building directory names.
pub const CANONICAL_MONTHS: [&str; 12] = [
    "ENERO",
    "FEBRERO",
    "MARZO",
    "ABRIL",
    "MAYO",
    "JUNIO",
    "JULIO",
    "AGOSTO",
    "SEPTIEMBRE",
    "OCTUBRE",
    "NOVIEMBRE",
    "DICIEMBRE",
];

/// A "Month Year" segment such as `JULIO 2025` or `10. OCTUBRE 2025`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonthYear {
    /// Month (1-12).
    pub month: u32,
    /// Four-digit year.
    pub year: i32,
}

/// A "Day Month" segment such as `19 JULIO` or `31 MAYO 2024`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DayMonth {
    /// Day of month as written (not range-checked).
    pub day: u32,
    /// Month (1-12).
    pub month: u32,
    /// Trailing year, when present.
    pub year: Option<i32>,
}

/// Every date-shaped reading of one segment.
///
/// A segment usually matches at most one shape; the numeric readings are
/// mutually exclusive with the textual ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SegmentToken {
    /// "Month Year" reading.
    pub month_year: Option<MonthYear>,
    /// "Day Month" reading.
    pub day_month: Option<DayMonth>,
    /// Exactly four digits.
    pub year: Option<i32>,
    /// One or two digits (a month or a day).
    pub small: Option<u32>,
}

impl SegmentToken {
    /// Returns `true` if the segment carries no date signal at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.month_year.is_none()
            && self.day_month.is_none()
            && self.year.is_none()
            && self.small.is_none()
    }
}

struct Patterns {
    month_year: Regex,
    day_month: Regex,
    year: Regex,
    small: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            // optional ordinal prefix ("10." / "10 -" / "10)") then name and year
            month_year: Regex::new(r"^(?:\d{1,2}\s*[.)\-]\s*)?([a-z]+) (\d{4})$")?,
            day_month: Regex::new(r"^(\d{1,2}) ([a-z]+)(?: (\d{4}))?$")?,
            year: Regex::new(r"^\d{4}$")?,
            small: Regex::new(r"^\d{1,2}$")?,
        })
    }
}

static PATTERNS: OnceLock<Option<Patterns>> = OnceLock::new();

fn patterns() -> Option<&'static Patterns> {
    PATTERNS
        .get_or_init(|| match Patterns::compile() {
            Ok(patterns) => Some(patterns),
            Err(error) => {
                tracing::error!(%error, "failed to compile segment patterns");
                None
            }
        })
        .as_ref()
}

/// Folds a segment for matching: lowercase, strip Spanish diacritics,
/// collapse runs of whitespace to one space, trim.
///
/// # Examples
///
/// ```
/// use pdx_dates::fold;
///
/// assert_eq!(fold("  DÍA   ÚNICO "), "dia unico");
/// assert_eq!(fold("Año"), "ano");
/// ```
#[must_use]
pub fn fold(segment: &str) -> String {
    let lowered: String = segment
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Looks up a Spanish month name, case and diacritic insensitive.
///
/// # Examples
///
/// ```
/// use pdx_dates::month_from_name;
///
/// assert_eq!(month_from_name("Septiembre"), Some(9));
/// assert_eq!(month_from_name("SETIEMBRE"), Some(9));
/// assert_eq!(month_from_name("hematologia"), None);
/// ```
#[must_use]
pub fn month_from_name(name: &str) -> Option<u32> {
    let folded = fold(name);
    MONTHS
        .iter()
        .find(|(candidate, _)| *candidate == folded)
        .map(|(_, month)| *month)
}

/// Parses a "Month Year" segment.
#[must_use]
pub fn parse_month_year(segment: &str) -> Option<MonthYear> {
    let folded = fold(segment);
    let caps = patterns()?.month_year.captures(&folded)?;
    let month = month_from_name(caps.get(1)?.as_str())?;
    let year = caps.get(2)?.as_str().parse().ok()?;
    Some(MonthYear { month, year })
}

/// Parses a "Day Month" segment with an optional trailing year.
#[must_use]
pub fn parse_day_month(segment: &str) -> Option<DayMonth> {
    let folded = fold(segment);
    let caps = patterns()?.day_month.captures(&folded)?;
    let day = caps.get(1)?.as_str().parse().ok()?;
    let month = month_from_name(caps.get(2)?.as_str())?;
    let year = match caps.get(3) {
        Some(m) => Some(m.as_str().parse().ok()?),
        None => None,
    };
    Some(DayMonth { day, month, year })
}

/// Parses a purely numeric four-digit year segment.
#[must_use]
pub fn parse_year(segment: &str) -> Option<i32> {
    let trimmed = segment.trim();
    if patterns()?.year.is_match(trimmed) {
        trimmed.parse().ok()
    } else {
        None
    }
}

/// Parses a purely numeric one- or two-digit segment (month or day).
#[must_use]
pub fn parse_small(segment: &str) -> Option<u32> {
    let trimmed = segment.trim();
    if patterns()?.small.is_match(trimmed) {
        trimmed.parse().ok()
    } else {
        None
    }
}

/// Classifies a segment by every pattern it matches.
///
/// # Examples
///
/// ```
/// use pdx_dates::classify;
///
/// let token = classify("10. OCTUBRE 2025");
/// let month_year = token.month_year.unwrap();
/// assert_eq!((month_year.month, month_year.year), (10, 2025));
///
/// assert!(classify("HEMATOLOGIA 2026").is_empty());
/// ```
#[must_use]
pub fn classify(segment: &str) -> SegmentToken {
    SegmentToken {
        month_year: parse_month_year(segment),
        day_month: parse_day_month(segment),
        year: parse_year(segment),
        small: parse_small(segment),
    }
}
