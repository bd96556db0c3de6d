use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::models::HistoryRow;

pub const MAX_PARTITION_KEY_LEN: usize = 31;
const INVALID_KEY_CHARS: &[char] = &['[', ']', '/', '\\', '?', '*', ':'];

/// Partition key for a target URL.
///
/// Two targets may map to the same key; they then share one partition.
pub fn sanitize(url: &str) -> String {
    let name = url
        .replace("https://", "")
        .replace("http://", "")
        .replace("www.", "");
    name.chars()
        .map(|c| if INVALID_KEY_CHARS.contains(&c) { '_' } else { c })
        .take(MAX_PARTITION_KEY_LEN)
        .collect()
}

/// Groups of distinct targets that end up in the same partition.
pub fn partition_collisions(targets: &[String]) -> Vec<(String, Vec<String>)> {
    let mut by_key: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for target in targets {
        let entry = by_key.entry(sanitize(target)).or_default();
        if !entry.contains(target) {
            entry.push(target.clone());
        }
    }
    by_key.into_iter().filter(|(_, v)| v.len() > 1).collect()
}

/// Durable per-key chronological log.
pub trait HistoryLog {
    fn append(&self, key: &str, row: HistoryRow) -> Result<(), StoreError>;

    /// Rows of one partition in append order; empty if it does not exist.
    fn partition(&self, key: &str) -> Result<Vec<HistoryRow>, StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Workbook {
    sheets: Vec<Sheet>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Sheet {
    name: String,
    rows: Vec<HistoryRow>,
}

/// Whole-file workbook with one sheet per partition.
///
/// Every append reads the full file and rewrites it. Not safe for
/// concurrent writers: overlapping runs lose updates.
pub struct WorkbookStore {
    path: PathBuf,
}

impl WorkbookStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Workbook, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Workbook::default()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.display(),
                    source,
                })
            }
        };
        serde_json::from_str(&content).map_err(|source| StoreError::Parse {
            path: self.display(),
            source,
        })
    }

    fn save(&self, workbook: &Workbook) -> Result<(), StoreError> {
        let write_err = |source: std::io::Error| StoreError::Write {
            path: self.display(),
            source,
        };
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let body = serde_json::to_vec_pretty(workbook)
            .map_err(|e| write_err(std::io::Error::other(e)))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(&body).map_err(write_err)?;
        // Keep whatever mode the operator gave the existing log.
        if let Ok(meta) = std::fs::metadata(&self.path) {
            tmp.as_file()
                .set_permissions(meta.permissions())
                .map_err(write_err)?;
        }
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

impl HistoryLog for WorkbookStore {
    fn append(&self, key: &str, row: HistoryRow) -> Result<(), StoreError> {
        let mut workbook = self.load()?;
        match workbook.sheets.iter_mut().find(|s| s.name == key) {
            Some(sheet) => sheet.rows.push(row),
            None => workbook.sheets.push(Sheet {
                name: key.to_string(),
                rows: vec![row],
            }),
        }
        self.save(&workbook)
    }

    fn partition(&self, key: &str) -> Result<Vec<HistoryRow>, StoreError> {
        Ok(self
            .load()?
            .sheets
            .into_iter()
            .find(|s| s.name == key)
            .map(|s| s.rows)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;

    fn row(url: &str, n: usize, status: Status) -> HistoryRow {
        HistoryRow {
            timestamp: format!("2025-03-01T12:00:{:02}.000000", n),
            url: url.to_string(),
            download_time: format!("{:.4}", n as f64 / 10.0),
            status,
        }
    }

    #[test]
    fn sanitize_strips_scheme_and_www() {
        assert_eq!(sanitize("https://www.example.com"), "example.com");
        assert_eq!(sanitize("http://example.org"), "example.org");
        assert_eq!(sanitize("https://ok.example"), "ok.example");
    }

    #[test]
    fn sanitize_replaces_invalid_chars_and_truncates() {
        let key = sanitize("https://www.example.com/a?b");
        assert_eq!(key, "example.com_a_b");
        assert_eq!(key, sanitize("https://www.example.com/a?b"));

        let long = sanitize("https://www.example.com:8443/[x]/y\\z*?q=averyveryverylongvalue");
        assert!(long.chars().count() <= MAX_PARTITION_KEY_LEN);
        assert!(!long.contains(INVALID_KEY_CHARS));
        assert!(long.starts_with("example.com_8443__x__y_z__q"));
    }

    #[test]
    fn collisions_are_reported_once_per_key() {
        let targets = vec![
            "https://www.example.com".to_string(),
            "http://example.com".to_string(),
            "https://other.example".to_string(),
            "https://www.example.com".to_string(),
        ];
        let collisions = partition_collisions(&targets);
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].0, "example.com");
        assert_eq!(collisions[0].1.len(), 2);
    }

    #[test]
    fn missing_store_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkbookStore::new(dir.path().join("history.json"));
        assert!(store.partition("anything").unwrap().is_empty());
    }

    #[test]
    fn appends_keep_order_and_leave_other_partitions_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkbookStore::new(dir.path().join("history.json"));

        store.append("b.example", row("https://b.example", 0, Status::Up)).unwrap();
        for n in 1..=3 {
            store
                .append("a.example", row("https://a.example", n, Status::Up))
                .unwrap();
        }
        store
            .append("a.example", row("https://a.example", 4, Status::Down))
            .unwrap();

        let a = store.partition("a.example").unwrap();
        assert_eq!(a.len(), 4);
        assert_eq!(a[0].download_time, "0.1000");
        assert_eq!(a[3].status, Status::Down);
        assert!(a.windows(2).all(|w| w[0].timestamp < w[1].timestamp));

        let b = store.partition("b.example").unwrap();
        assert_eq!(b, vec![row("https://b.example", 0, Status::Up)]);
    }

    #[test]
    fn file_uses_workbook_column_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let store = WorkbookStore::new(&path);
        store.append("ok.example", row("https://ok.example", 1, Status::Up)).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let first = &raw["sheets"][0];
        assert_eq!(first["name"], "ok.example");
        assert_eq!(first["rows"][0]["Download Time (s)"], "0.1000");
        assert_eq!(first["rows"][0]["Status"], "UP");
        assert_eq!(first["rows"][0]["URL"], "https://ok.example");
    }

    #[cfg(unix)]
    #[test]
    fn rewrite_keeps_existing_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let store = WorkbookStore::new(&path);
        store.append("ok.example", row("https://ok.example", 1, Status::Up)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        store.append("ok.example", row("https://ok.example", 2, Status::Up)).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
        assert_eq!(store.partition("ok.example").unwrap().len(), 2);
    }

    #[test]
    fn corrupt_store_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "not a workbook").unwrap();
        let store = WorkbookStore::new(&path);

        let err = store
            .append("ok.example", row("https://ok.example", 1, Status::Up))
            .unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "not a workbook");
    }
}
