//! Targeted Date Locator.
//!
//! For a handful of explicit days, builds the directory names each known
//! layout would use and probes them directly instead of walking the tree:
//!
//! ```text
//! <SUBJECT> <YEAR>/<MONTH> <YEAR>/<DAY> <MONTH>     Spanish nested
//! <MONTH> <YEAR>/<DAY> <MONTH>                      Spanish, no subject folder
//! <YEAR>/<MM>/<DD>  or  <YEAR>/<M>/<D>              numeric
//! ```
//!
//! Per day, the Spanish layout is tried first (every subject folder that
//! exists for the year) and the numeric layout only when no Spanish day
//! folder matched. A matching day folder is listed recursively, so lab or
//! section folders below it are included. When nothing matches for any day
//! the caller falls back to a walk.

use chrono::{Datelike, NaiveDate};
use pdx_core::{FxHashSet, ScanWindow};
use pdx_dates::token::{CANONICAL_MONTHS, parse_month_year, parse_year};
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::fs::{FileSystem, join_rel};

/// Files found under the probed day folders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocateOutput {
    /// Relative file paths, as named on disk.
    pub files: Vec<String>,
    /// Day folders that existed.
    pub matched_dirs: Vec<String>,
    /// Directories below a matched day folder that could not be listed.
    pub unreadable_dirs: usize,
}

/// Direct-path lookup of day folders.
#[derive(Debug)]
pub struct TargetedLocator<'a, F> {
    fs: &'a F,
    subjects: Vec<String>,
}

impl<'a, F: FileSystem> TargetedLocator<'a, F> {
    /// Creates a locator with the configured subject prefixes.
    ///
    /// Root folders named `"<text> <year>"` are added to these when
    /// [`locate`](Self::locate) lists the root.
    #[must_use]
    pub fn new(fs: &'a F, subjects: &[String]) -> Self {
        Self {
            fs,
            subjects: subjects
                .iter()
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Probes every day of `window`.
    pub fn locate(&self, window: &ScanWindow) -> LocateOutput {
        let mut output = LocateOutput::default();
        let root_dirs = self.root_dirs();
        let subjects = self.subjects_with(root_dirs.as_ref());

        for day in window.days() {
            let matched = self.spanish_day_dirs(day, &subjects, root_dirs.as_ref());
            let matched = if matched.is_empty() {
                self.numeric_day_dir(day).into_iter().collect()
            } else {
                matched
            };
            if matched.is_empty() {
                debug!(%day, "no day folder found");
            }
            for dir in matched {
                self.list_recursive(&dir, &mut output);
                output.matched_dirs.push(dir);
            }
        }

        output
    }

    /// Names of the root's directories, or `None` if the root could not be
    /// listed (candidates are then probed blindly).
    fn root_dirs(&self) -> Option<FxHashSet<String>> {
        match self.fs.list_dir("") {
            Ok(entries) => Some(
                entries
                    .into_iter()
                    .filter(|e| e.is_dir)
                    .map(|e| e.name)
                    .collect(),
            ),
            Err(err) => {
                warn!(error = %err, "could not list share root for subject discovery");
                None
            }
        }
    }

    fn subjects_with(&self, root_dirs: Option<&FxHashSet<String>>) -> Vec<String> {
        let mut subjects = self.subjects.clone();
        for name in root_dirs.into_iter().flatten() {
            if let Some(subject) = subject_of(name) {
                if !subjects.iter().any(|s| s == subject) {
                    subjects.push(subject.to_owned());
                }
            }
        }
        subjects.sort();
        subjects
    }

    fn spanish_day_dirs(
        &self,
        day: NaiveDate,
        subjects: &[String],
        root_dirs: Option<&FxHashSet<String>>,
    ) -> Vec<String> {
        let year = day.year();
        let mut bases: Vec<String> = vec![String::new()];
        for subject in subjects {
            let base = format!("{subject} {year}");
            let exists = match root_dirs {
                Some(dirs) => dirs.contains(&base),
                None => self.fs.is_dir(&base),
            };
            if exists {
                bases.push(base);
            }
        }

        bases
            .iter()
            .filter_map(|base| self.probe_spanish(base, day))
            .collect()
    }

    fn probe_spanish(&self, base: &str, day: NaiveDate) -> Option<String> {
        for month_dir in month_folders(day) {
            let month_path = join_rel(base, &month_dir);
            if !self.fs.is_dir(&month_path) {
                continue;
            }
            for day_dir in day_folders(day) {
                let day_path = join_rel(&month_path, &day_dir);
                if self.fs.is_dir(&day_path) {
                    return Some(day_path);
                }
            }
        }
        None
    }

    fn numeric_day_dir(&self, day: NaiveDate) -> Option<String> {
        numeric_candidates(day)
            .into_iter()
            .find(|candidate| self.fs.is_dir(candidate))
    }

    fn list_recursive(&self, dir: &str, output: &mut LocateOutput) {
        let mut stack = vec![dir.to_owned()];
        while let Some(current) = stack.pop() {
            let entries = match self.fs.list_dir(&current) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(dir = %current, error = %err, "skipping unreadable directory");
                    output.unreadable_dirs += 1;
                    continue;
                }
            };
            for entry in entries {
                let rel = join_rel(&current, &entry.name);
                if entry.is_dir {
                    stack.push(rel);
                } else {
                    output.files.push(rel);
                }
            }
        }
    }
}

/// Extracts `"HEMATOLOGIA"` from a root folder named `"HEMATOLOGIA 2026"`.
/// Month folders such as `"ENERO 2026"` are not subjects.
fn subject_of(name: &str) -> Option<&str> {
    let (prefix, year) = name.trim().rsplit_once(' ')?;
    parse_year(year)?;
    let prefix = prefix.trim();
    if prefix.is_empty() || parse_month_year(name).is_some() {
        return None;
    }
    Some(prefix)
}

fn month_names(month: u32) -> SmallVec<[&'static str; 2]> {
    let mut names = SmallVec::new();
    let index = usize::try_from(month).unwrap_or_default().wrapping_sub(1);
    if let Some(name) = CANONICAL_MONTHS.get(index) {
        names.push(*name);
    }
    if month == 9 {
        names.push("SETIEMBRE");
    }
    names
}

/// `ENERO 2026`, `01. ENERO 2026`, `1. ENERO 2026`.
fn month_folders(day: NaiveDate) -> SmallVec<[String; 6]> {
    let (year, month) = (day.year(), day.month());
    let mut folders = SmallVec::new();
    for name in month_names(month) {
        folders.push(format!("{name} {year}"));
        folders.push(format!("{month:02}. {name} {year}"));
        if month < 10 {
            folders.push(format!("{month}. {name} {year}"));
        }
    }
    folders
}

/// `30 ENERO`, `05 ENERO`, `5 ENERO`, and the same with a trailing year.
fn day_folders(day: NaiveDate) -> SmallVec<[String; 8]> {
    let (year, month, dom) = (day.year(), day.month(), day.day());
    let mut spellings: SmallVec<[String; 2]> = SmallVec::new();
    spellings.push(dom.to_string());
    if dom < 10 {
        spellings.push(format!("{dom:02}"));
    }

    let mut folders = SmallVec::new();
    for name in month_names(month) {
        for spelling in &spellings {
            folders.push(format!("{spelling} {name}"));
            folders.push(format!("{spelling} {name} {year}"));
        }
    }
    folders
}

/// `2026/01/05` then `2026/1/5`.
fn numeric_candidates(day: NaiveDate) -> SmallVec<[String; 2]> {
    let (year, month, dom) = (day.year(), day.month(), day.day());
    let padded = format!("{year}/{month:02}/{dom:02}");
    let unpadded = format!("{year}/{month}/{dom}");
    let mut candidates = SmallVec::new();
    if padded != unpadded {
        candidates.push(padded);
    }
    candidates.push(unpadded);
    candidates
}

#[cfg(test)]
mod tests {
    use std::fs;

    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    use super::*;
    use crate::fs::NativeFs;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn share(files: &[&str]) -> (TempDir, NativeFs) {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        for file in files {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, b"%PDF").unwrap();
        }
        (dir, NativeFs::new(root))
    }

    fn sorted(mut files: Vec<String>) -> Vec<String> {
        files.sort();
        files
    }

    #[test]
    fn test_subject_of() {
        assert_eq!(subject_of("HEMATOLOGIA 2026"), Some("HEMATOLOGIA"));
        assert_eq!(subject_of("QUIMICA CLINICA 2025"), Some("QUIMICA CLINICA"));
        assert_eq!(subject_of("ENERO 2026"), None);
        assert_eq!(subject_of("10. OCTUBRE 2025"), None);
        assert_eq!(subject_of("2026"), None);
        assert_eq!(subject_of("VARIOS"), None);
    }

    #[test]
    fn test_candidate_spellings() {
        let folders = month_folders(day(2025, 9, 3));
        assert!(folders.contains(&"SEPTIEMBRE 2025".to_owned()));
        assert!(folders.contains(&"SETIEMBRE 2025".to_owned()));
        assert!(folders.contains(&"09. SEPTIEMBRE 2025".to_owned()));

        let days = day_folders(day(2025, 9, 3));
        assert!(days.contains(&"3 SEPTIEMBRE".to_owned()));
        assert!(days.contains(&"03 SETIEMBRE".to_owned()));

        assert_eq!(
            numeric_candidates(day(2026, 1, 5)).as_slice(),
            ["2026/01/05", "2026/1/5"]
        );
        assert_eq!(numeric_candidates(day(2026, 11, 25)).as_slice(), ["2026/11/25"]);
    }

    #[test]
    fn test_discovered_subject_with_sub_folders() {
        let (_dir, fs) = share(&[
            "HEMATOLOGIA 2026/ENERO 2026/29 ENERO/SECCION A/a.pdf",
            "HEMATOLOGIA 2026/ENERO 2026/29 ENERO/b.pdf",
            "HEMATOLOGIA 2026/ENERO 2026/30 ENERO/c.pdf",
        ]);
        let out = TargetedLocator::new(&fs, &[]).locate(&ScanWindow::from_days([day(2026, 1, 29)]));
        assert_eq!(
            sorted(out.files),
            [
                "HEMATOLOGIA 2026/ENERO 2026/29 ENERO/SECCION A/a.pdf",
                "HEMATOLOGIA 2026/ENERO 2026/29 ENERO/b.pdf",
            ]
        );
        assert_eq!(out.matched_dirs, ["HEMATOLOGIA 2026/ENERO 2026/29 ENERO"]);
    }

    #[test]
    fn test_spanish_wins_over_numeric_for_same_day() {
        let (_dir, fs) = share(&["JULIO 2025/19 JULIO/x.pdf", "2025/07/19/y.pdf"]);
        let out = TargetedLocator::new(&fs, &[]).locate(&ScanWindow::from_days([day(2025, 7, 19)]));
        assert_eq!(out.files, ["JULIO 2025/19 JULIO/x.pdf"]);
    }

    #[test]
    fn test_numeric_unpadded() {
        let (_dir, fs) = share(&["2026/1/5/x.pdf"]);
        let out = TargetedLocator::new(&fs, &[]).locate(&ScanWindow::from_days([day(2026, 1, 5)]));
        assert_eq!(out.files, ["2026/1/5/x.pdf"]);
    }

    #[test]
    fn test_ordinal_month_and_padded_day() {
        let (_dir, fs) = share(&["LAB 2025/10. OCTUBRE 2025/05 OCTUBRE/x.pdf"]);
        let out = TargetedLocator::new(&fs, &["LAB".to_owned()])
            .locate(&ScanWindow::from_days([day(2025, 10, 5)]));
        assert_eq!(out.files, ["LAB 2025/10. OCTUBRE 2025/05 OCTUBRE/x.pdf"]);
    }

    #[test]
    fn test_several_days_and_no_match() {
        let (_dir, fs) = share(&["2026/01/28/a.pdf", "2026/01/29/b.pdf"]);
        let window = ScanWindow::between(day(2026, 1, 28), day(2026, 1, 30));
        let out = TargetedLocator::new(&fs, &[]).locate(&window);
        assert_eq!(sorted(out.files), ["2026/01/28/a.pdf", "2026/01/29/b.pdf"]);

        let empty = TargetedLocator::new(&fs, &[]).locate(&ScanWindow::from_days([day(2026, 2, 1)]));
        assert!(empty.files.is_empty());
        assert!(empty.matched_dirs.is_empty());
    }
}
