//! Client/cargo lookup table.
//!
//! The table is a comma-separated file with a header row and four columns,
//! taken by position: corporate name, cargo name, cargo tax id, cargo code.
//! Header names are ignored.

use crate::error::LoadError;
use crate::types::LookupRecord;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

/// Number of columns every row must have.
const COLUMN_COUNT: usize = 4;

/// Read-only set of lookup records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupTable {
    records: Vec<LookupRecord>,
}

impl LookupTable {
    /// Build a table from already parsed records.
    pub fn from_records(records: Vec<LookupRecord>) -> Self {
        Self { records }
    }

    /// Load the table from a CSV file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LoadError::Missing {
                path: path.to_path_buf(),
            },
            _ => LoadError::Malformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        })?;

        let table = Self::from_reader(file).map_err(|reason| LoadError::Malformed {
            path: path.to_path_buf(),
            reason,
        })?;

        log::info!(
            "Loaded {} lookup records ({} clients) from {}",
            table.len(),
            table.distinct_entities().len(),
            path.display()
        );
        Ok(table)
    }

    /// Parse the table from any CSV reader.
    ///
    /// Returns the failure reason as text; `load` attaches the path.
    pub fn from_reader<R: Read>(reader: R) -> std::result::Result<Self, String> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let header_len = reader
            .headers()
            .map_err(|e| format!("Failed to read header row: {}", e))?
            .len();
        if header_len != COLUMN_COUNT {
            return Err(format!(
                "expected {} columns, header has {}",
                COLUMN_COUNT, header_len
            ));
        }

        let mut records = Vec::new();
        for result in reader.records() {
            let row = result.map_err(|e| format!("Failed to read record: {}", e))?;
            records.push(LookupRecord {
                entity_name: row[0].to_string(),
                cargo_name: row[1].to_string(),
                cargo_tax_id: row[2].to_string(),
                cargo_code: row[3].to_string(),
            });
        }

        Ok(Self { records })
    }

    /// All records in file order.
    pub fn records(&self) -> &[LookupRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct client names, sorted.
    pub fn distinct_entities(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.entity_name.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Distinct cargo names of one client, sorted. Empty for an unknown client.
    pub fn cargos_for(&self, entity: &str) -> Vec<String> {
        self.records
            .iter()
            .filter(|r| r.entity_name == entity)
            .map(|r| r.cargo_name.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// First record matching a client/cargo pair.
    pub fn find(&self, entity: &str, cargo: &str) -> Option<&LookupRecord> {
        self.records
            .iter()
            .find(|r| r.entity_name == entity && r.cargo_name == cargo)
    }
}

/// Memoised lookup table, reloaded when the source file changes.
///
/// Readers share the loaded table through an `Arc`; a reload swaps it out
/// without affecting tables already handed out.
#[derive(Debug)]
pub struct TableCache {
    path: PathBuf,
    cached: RwLock<Option<CachedTable>>,
}

#[derive(Debug)]
struct CachedTable {
    modified: Option<SystemTime>,
    table: Arc<LookupTable>,
}

impl TableCache {
    /// Create an empty cache for the given source. Nothing is read until `get`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: RwLock::new(None),
        }
    }

    /// Path of the record source.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the memoised table, loading it first if absent or stale.
    pub fn get(&self) -> Result<Arc<LookupTable>, LoadError> {
        let modified = source_modified(&self.path);

        {
            let cached = self.cached.read().unwrap_or_else(|e| e.into_inner());
            if let Some(entry) = cached.as_ref() {
                if entry.modified == modified {
                    return Ok(Arc::clone(&entry.table));
                }
                log::info!("Lookup table {} changed on disk; reloading", self.path.display());
            }
        }

        let mut cached = self.cached.write().unwrap_or_else(|e| e.into_inner());
        match LookupTable::load(&self.path) {
            Ok(table) => {
                let table = Arc::new(table);
                *cached = Some(CachedTable {
                    modified,
                    table: Arc::clone(&table),
                });
                Ok(table)
            }
            Err(e) => {
                *cached = None;
                Err(e)
            }
        }
    }

    /// Drop the memoised table; the next `get` reads the source again.
    pub fn invalidate(&self) {
        let mut cached = self.cached.write().unwrap_or_else(|e| e.into_inner());
        if cached.take().is_some() {
            log::debug!("Lookup table cache invalidated");
        }
    }
}

fn source_modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    const SAMPLE: &str = "\
NOME EMPRESARIAL,NOME CARGA,CNPJ CARGA,CODIGO CARGA
Beta Energia,Carga Norte,11.111.111/0001-11,C-01
Acme Ltd,LFP 48V,22.222.222/0001-22,C-02
Acme Ltd,Lithium-Ion Pack,33.333.333/0001-33,C-03
Acme Ltd,LFP 48V,44.444.444/0001-44,C-04
Beta Energia,Carga Leste,55.555.555/0001-55,C-05
";

    fn sample_table() -> LookupTable {
        LookupTable::from_reader(SAMPLE.as_bytes()).unwrap()
    }

    fn write_file(path: &Path, content: &str) {
        let mut file = File::create(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_distinct_entities_sorted_and_deduplicated() {
        let table = sample_table();
        assert_eq!(table.len(), 5);
        assert_eq!(table.distinct_entities(), vec!["Acme Ltd", "Beta Energia"]);
    }

    #[test]
    fn test_cargos_for_filters_by_entity() {
        let table = sample_table();
        assert_eq!(table.cargos_for("Acme Ltd"), vec!["LFP 48V", "Lithium-Ion Pack"]);
        assert_eq!(
            table.cargos_for("Beta Energia"),
            vec!["Carga Leste", "Carga Norte"]
        );
    }

    #[test]
    fn test_cargos_for_unknown_entity_is_empty() {
        let table = sample_table();
        assert!(table.cargos_for("Gamma").is_empty());
        assert!(table.cargos_for("").is_empty());
        // Matching is exact, not by prefix or case
        assert!(table.cargos_for("acme ltd").is_empty());
    }

    #[test]
    fn test_find_returns_first_match() {
        let table = sample_table();
        let record = table.find("Acme Ltd", "LFP 48V").unwrap();
        assert_eq!(record.cargo_tax_id, "22.222.222/0001-22");
        assert_eq!(record.cargo_code, "C-02");
        assert!(table.find("Beta Energia", "LFP 48V").is_none());
    }

    #[test]
    fn test_fields_kept_verbatim() {
        let table =
            LookupTable::from_reader("a,b,c,d\n\"Acme, Ltd\", Pack ,1,2\n".as_bytes()).unwrap();
        assert_eq!(table.records()[0].entity_name, "Acme, Ltd");
        assert_eq!(table.records()[0].cargo_name, " Pack ");
    }

    #[test]
    fn test_header_only_is_empty_table() {
        let table = LookupTable::from_reader("a,b,c,d\n".as_bytes()).unwrap();
        assert!(table.is_empty());
        assert!(table.distinct_entities().is_empty());
    }

    #[test]
    fn test_wrong_column_count_is_malformed() {
        let err = LookupTable::from_reader("a,b,c\nx,y,z\n".as_bytes()).unwrap_err();
        assert!(err.contains("expected 4 columns"));

        let err = LookupTable::from_reader("a,b,c,d\nx,y,z\n".as_bytes()).unwrap_err();
        assert!(err.contains("Failed to read record"));
    }

    #[test]
    fn test_extra_header_column_is_malformed() {
        let err = LookupTable::from_reader("a,b,c,d,e\nx,y,z,w,v\n".as_bytes()).unwrap_err();
        assert_eq!(err, "expected 4 columns, header has 5");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.csv");
        write_file(&path, "a,b,c,d,e\nx,y,z,w,v\n");
        match LookupTable::load(&path) {
            Err(LoadError::Malformed { path: reported, reason }) => {
                assert_eq!(reported, path);
                assert!(reason.contains("header has 5"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let err = LookupTable::from_reader(&b"a,b,c,d\nAcme\xff,x,1,2\n"[..]).unwrap_err();
        assert!(err.contains("Failed to read record"));
        assert!(err.to_lowercase().contains("utf-8"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.csv");
        std::fs::write(&path, b"a,b,c,d\nAcme\xff,x,1,2\n").unwrap();
        assert!(matches!(
            LookupTable::load(&path),
            Err(LoadError::Malformed { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.csv");
        assert_eq!(
            LookupTable::load(&path),
            Err(LoadError::Missing { path: path.clone() })
        );
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        write_file(&path, "");
        assert!(matches!(
            LookupTable::load(&path),
            Err(LoadError::Malformed { .. })
        ));
    }

    #[test]
    fn test_cache_memoises_until_invalidated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relacao.csv");
        write_file(&path, SAMPLE);

        let cache = TableCache::new(&path);
        let first = cache.get().unwrap();
        let second = cache.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        cache.invalidate();
        let third = cache.get().unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(*first, *third);
    }

    #[test]
    fn test_cache_reloads_when_source_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relacao.csv");
        write_file(&path, SAMPLE);

        let cache = TableCache::new(&path);
        assert_eq!(cache.get().unwrap().distinct_entities().len(), 2);

        write_file(&path, "a,b,c,d\nGamma,Carga Sul,1,2\n");
        let file = File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(60))
            .unwrap();
        drop(file);

        assert_eq!(cache.get().unwrap().distinct_entities(), vec!["Gamma"]);
    }

    #[test]
    fn test_cache_reports_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TableCache::new(dir.path().join("absent.csv"));
        assert!(matches!(cache.get(), Err(LoadError::Missing { .. })));
    }
}
