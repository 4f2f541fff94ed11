//! SQLite catalog backend.

use camino::Utf8Path;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pdx_core::{CatalogEntry, Provenance, ResolvedDate};
use rusqlite::types::Value;
use rusqlite::{
    Connection, OptionalExtension, Row, TransactionBehavior, params, params_from_iter,
};
use tracing::debug;

use crate::{Catalog, CatalogError, CatalogPage, CatalogQuery, UpsertOutcome};

const COLUMNS: &str = "path, name, source, year, month, day";
const LAST_SYNC_KEY: &str = "last_sync";

/// A catalog persisted in a single SQLite file.
///
/// The connection sits behind a mutex; every upsert runs its
/// read-compare-write inside one `IMMEDIATE` transaction, so a second
/// process writing the same file waits on the busy timeout instead of
/// racing on the unique path.
#[derive(Debug)]
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

/// A row as stored, before validation.
struct StoredRow {
    path: String,
    name: String,
    source: String,
    year: i32,
    month: u32,
    day: u32,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            path: row.get(0)?,
            name: row.get(1)?,
            source: row.get(2)?,
            year: row.get(3)?,
            month: row.get(4)?,
            day: row.get(5)?,
        })
    }

    fn same_fields(&self, entry: &CatalogEntry) -> bool {
        self.name == entry.name
            && self.source == entry.provenance.as_str()
            && self.year == entry.date.year()
            && self.month == entry.date.month()
            && self.day == entry.date.day()
    }

    fn into_entry(self) -> Result<CatalogEntry, CatalogError> {
        let provenance: Provenance = self
            .source
            .parse()
            .map_err(|reason: String| CatalogError::invalid_value(&self.path, "source", reason))?;
        let date = ResolvedDate::new(self.year, self.month, self.day).ok_or_else(|| {
            CatalogError::invalid_value(
                &self.path,
                "year",
                format!("{}-{}-{} is out of range", self.year, self.month, self.day),
            )
        })?;
        Ok(CatalogEntry {
            path: self.path,
            name: self.name,
            date,
            provenance,
        })
    }
}

impl SqliteCatalog {
    /// Opens (creating if needed) the catalog file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the parent directory cannot be created
    /// and [`CatalogError::Sqlite`] if the database cannot be opened or
    /// initialized.
    pub fn open(path: &Utf8Path) -> Result<Self, CatalogError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CatalogError::Io {
                path: path.to_owned(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        let catalog = Self::init(conn)?;
        debug!(path = %path, "catalog opened");
        Ok(catalog)
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Sqlite`] if initialization fails.
    pub fn open_in_memory() -> Result<Self, CatalogError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, CatalogError> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Escapes `%`, `_` and the escape character itself for a `LIKE ... ESCAPE '\'`.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn to_sql_int(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl Catalog for SqliteCatalog {
    fn upsert(&self, entry: &CatalogEntry) -> Result<UpsertOutcome, CatalogError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = tx
            .query_row(
                &format!("SELECT {COLUMNS} FROM pdf_documents WHERE path = ?1"),
                [&entry.path],
                StoredRow::from_row,
            )
            .optional()?;

        let now = Utc::now().to_rfc3339();
        let outcome = match existing {
            Some(row) if row.same_fields(entry) => return Ok(UpsertOutcome::Unchanged),
            Some(_) => {
                tx.execute(
                    "UPDATE pdf_documents
                     SET name = ?2, source = ?3, year = ?4, month = ?5, day = ?6, updated_at = ?7
                     WHERE path = ?1",
                    params![
                        entry.path,
                        entry.name,
                        entry.provenance.as_str(),
                        entry.date.year(),
                        entry.date.month(),
                        entry.date.day(),
                        now,
                    ],
                )?;
                UpsertOutcome::Updated
            }
            None => {
                tx.execute(
                    "INSERT INTO pdf_documents
                     (path, name, source, year, month, day, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                    params![
                        entry.path,
                        entry.name,
                        entry.provenance.as_str(),
                        entry.date.year(),
                        entry.date.month(),
                        entry.date.day(),
                        now,
                    ],
                )?;
                UpsertOutcome::Inserted
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    fn get(&self, path: &str) -> Result<Option<CatalogEntry>, CatalogError> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM pdf_documents WHERE path = ?1"),
            [path],
            StoredRow::from_row,
        )
        .optional()?
        .map(StoredRow::into_entry)
        .transpose()
    }

    fn len(&self) -> Result<usize, CatalogError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM pdf_documents", [], |row| {
            row.get(0)
        })?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn query(&self, query: &CatalogQuery) -> Result<CatalogPage, CatalogError> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(year) = query.year {
            clauses.push("year = ?");
            values.push(Value::Integer(i64::from(year)));
        }
        if let Some(month) = query.month {
            clauses.push("month = ?");
            values.push(Value::Integer(i64::from(month)));
        }
        if let Some(day) = query.day {
            clauses.push("day = ?");
            values.push(Value::Integer(i64::from(day)));
        }
        if let Some(needle) = &query.search {
            // LIKE folds ASCII case only
            clauses.push(r"name LIKE ? ESCAPE '\'");
            values.push(Value::Text(format!("%{}%", escape_like(needle))));
        }

        let filter = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let conn = self.conn.lock();
        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM pdf_documents{filter}"),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        values.push(Value::Integer(to_sql_int(query.effective_per_page())));
        values.push(Value::Integer(to_sql_int(query.offset())));
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM pdf_documents{filter}
             ORDER BY year DESC, month DESC, day DESC, path ASC
             LIMIT ? OFFSET ?"
        ))?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), StoredRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        let entries = rows
            .into_iter()
            .map(StoredRow::into_entry)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CatalogPage {
            entries,
            total: usize::try_from(total).unwrap_or_default(),
            page: query.effective_page(),
            per_page: query.effective_per_page(),
        })
    }

    fn last_sync(&self) -> Result<Option<DateTime<Utc>>, CatalogError> {
        let conn = self.conn.lock();
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM catalog_meta WHERE key = ?1",
                [LAST_SYNC_KEY],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|value| {
            DateTime::parse_from_rfc3339(&value)
                .map(|at| at.with_timezone(&Utc))
                .map_err(|err| CatalogError::invalid_value(LAST_SYNC_KEY, "value", err.to_string()))
        })
        .transpose()
    }

    fn set_last_sync(&self, at: DateTime<Utc>) -> Result<(), CatalogError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO catalog_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![LAST_SYNC_KEY, at.to_rfc3339()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;
    use chrono::TimeZone;

    use super::*;

    fn entry(path: &str, name: &str, y: i32, m: u32, d: u32) -> CatalogEntry {
        CatalogEntry::remote(path, name, ResolvedDate::with_max_year(y, m, d, 2027).unwrap())
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        let e = entry("2025/07/19/1174621.pdf", "1174621.pdf", 2025, 7, 19);
        assert_eq!(catalog.upsert(&e).unwrap(), UpsertOutcome::Inserted);
        assert_eq!(catalog.upsert(&e).unwrap(), UpsertOutcome::Unchanged);
        assert_eq!(catalog.len().unwrap(), 1);
        assert_eq!(catalog.get(&e.path).unwrap(), Some(e));
    }

    #[test]
    fn test_upsert_refreshes_changed_fields() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        let mut e = entry("JULIO 2025/19 JULIO/x.pdf", "x.pdf", 2025, 7, 19);
        catalog.upsert(&e).unwrap();
        e.provenance = Provenance::Local;
        assert_eq!(catalog.upsert(&e).unwrap(), UpsertOutcome::Updated);
        let stored = catalog.get(&e.path).unwrap().unwrap();
        assert_eq!(stored.provenance, Provenance::Local);
        assert_eq!(catalog.len().unwrap(), 1);
    }

    #[test]
    fn test_get_missing() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        assert!(catalog.get("nope.pdf").unwrap().is_none());
        assert!(catalog.is_empty().unwrap());
    }

    #[test]
    fn test_query_filters_and_order() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        catalog.upsert(&entry("a/Informe-1.pdf", "Informe-1.pdf", 2026, 1, 29)).unwrap();
        catalog.upsert(&entry("b/Informe-2.pdf", "Informe-2.pdf", 2026, 1, 30)).unwrap();
        catalog.upsert(&entry("c/hemograma.pdf", "hemograma.pdf", 2025, 7, 19)).unwrap();

        let all = catalog.query(&CatalogQuery::new()).unwrap();
        assert_eq!(all.total, 3);
        let paths: Vec<_> = all.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["b/Informe-2.pdf", "a/Informe-1.pdf", "c/hemograma.pdf"]);

        let january = catalog.query(&CatalogQuery::new().year(2026).month(1)).unwrap();
        assert_eq!(january.total, 2);

        let search = catalog.query(&CatalogQuery::new().search("INFORME")).unwrap();
        assert_eq!(search.total, 2);

        let day = catalog.query(&CatalogQuery::new().day(19)).unwrap();
        assert_eq!(day.entries.len(), 1);
        assert_eq!(day.entries[0].name, "hemograma.pdf");
    }

    #[test]
    fn test_query_pagination() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        for day in 1..=7 {
            catalog
                .upsert(&entry(&format!("2026/01/{day}/x.pdf"), "x.pdf", 2026, 1, day))
                .unwrap();
        }
        let page = catalog.query(&CatalogQuery::new().per_page(3).page(3)).unwrap();
        assert_eq!(page.total, 7);
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].date.day(), 1);
        assert_eq!(page.last_page(), 3);
    }

    #[test]
    fn test_search_escapes_wildcards() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        catalog.upsert(&entry("a/100% final.pdf", "100% final.pdf", 2026, 1, 1)).unwrap();
        catalog.upsert(&entry("a/1000 final.pdf", "1000 final.pdf", 2026, 1, 1)).unwrap();
        let page = catalog.query(&CatalogQuery::new().search("100%")).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(escape_like(r"a_b\c"), r"a\_b\\c");
    }

    #[test]
    fn test_last_sync_roundtrip() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        assert!(catalog.last_sync().unwrap().is_none());
        let at = Utc.with_ymd_and_hms(2026, 1, 29, 16, 2, 0).unwrap();
        catalog.set_last_sync(at).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 1, 30, 8, 0, 0).unwrap();
        catalog.set_last_sync(later).unwrap();
        assert_eq!(catalog.last_sync().unwrap(), Some(later));
    }

    #[test]
    fn test_invalid_stored_source() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        catalog
            .conn
            .lock()
            .execute(
                "INSERT INTO pdf_documents (path, name, source, year, month, day, created_at, updated_at)
                 VALUES ('x/y.pdf', 'y.pdf', 'ftp', 2025, 1, 1, '', '')",
                [],
            )
            .unwrap();
        let err = catalog.get("x/y.pdf").unwrap_err();
        assert!(matches!(err, CatalogError::InvalidValue { column: "source", .. }));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("nested/pdfdex.sqlite3")).unwrap();
        {
            let catalog = SqliteCatalog::open(&path).unwrap();
            catalog.upsert(&entry("2025/07/19/x.pdf", "x.pdf", 2025, 7, 19)).unwrap();
        }
        let catalog = SqliteCatalog::open(&path).unwrap();
        assert_eq!(catalog.len().unwrap(), 1);
    }

    #[test]
    fn test_two_connections_upsert_same_paths() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("pdfdex.sqlite3")).unwrap();
        let first = SqliteCatalog::open(&path).unwrap();
        let second = SqliteCatalog::open(&path).unwrap();
        let entries: Vec<CatalogEntry> = (1..=28)
            .map(|day| entry(&format!("2025/02/{day:02}/x.pdf"), "x.pdf", 2025, 2, day))
            .collect();

        let barrier = std::sync::Barrier::new(2);
        let inserted = std::thread::scope(|scope| {
            let handles: Vec<_> = [&first, &second]
                .into_iter()
                .map(|catalog| {
                    let (barrier, entries) = (&barrier, &entries);
                    scope.spawn(move || {
                        barrier.wait();
                        entries
                            .iter()
                            .map(|e| catalog.upsert(e).unwrap())
                            .filter(|outcome| *outcome == UpsertOutcome::Inserted)
                            .count()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .sum::<usize>()
        });

        assert_eq!(inserted, entries.len());
        assert_eq!(first.len().unwrap(), entries.len());
    }
}
