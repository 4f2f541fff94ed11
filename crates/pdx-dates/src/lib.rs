//! Path-to-date inference for shared PDF trees.
//!
//! Documents on the share carry no reliable date in their filename or
//! metadata; the date lives in the directory names, written in several
//! inconsistent conventions:
//!
//! ```text
//! 2025/07/19/1174621.pdf                                numeric
//! HEMATOLOGIA 2026/ENERO 2026/30 ENERO/informe.pdf      Spanish nested
//! 10. OCTUBRE 2025/5 OCTUBRE/BIOQUIMICA/informe.pdf     ordinal month, subject below day
//! MAYO 2024/31 MAYO 2024/123456/informe.pdf             day with trailing year, id folder
//! ```
//!
//! # Overview
//!
//! - [`token`]: the Date Token Parser. Classifies one segment as
//!   "Month Year", "Day Month" or a bare number, with accent folding and the
//!   Spanish month table.
//! - [`resolver`]: the Path Date Resolver. Runs the ordered [`Strategy`] list
//!   over a path's directory segments and applies range validation.
//!
//! # Example
//!
//! ```
//! use pdx_dates::{PathDateResolver, Strategy};
//!
//! let resolver = PathDateResolver::with_max_year(2027);
//! let resolution = resolver
//!     .resolve_path("HEMATOLOGIA 2026/ENERO 2026/30 ENERO/informe.pdf")
//!     .unwrap();
//! assert_eq!(resolution.date.to_string(), "2026-01-30");
//! assert_eq!(resolution.strategy, Strategy::MonthYearDayMonth);
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod error;
pub mod resolver;
pub mod token;

pub use error::Unresolved;
pub use resolver::{PathDateResolver, Resolution, Strategy};
pub use token::{DayMonth, MonthYear, SegmentToken, classify, fold, month_from_name};
