//! Resource Loader
//!
//! Builds the static lookup tables once at startup:
//! - species table: species id → [`SpeciesRecord`] (`flower_names.json`)
//! - class index map: classifier output position → species id (`classes.json`)
//!
//! The class list is authoritative because it records training-time class
//! order. Without it the map is built from the sorted species ids, which is
//! only an approximation of the order the classifier was trained with.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Species metadata file name inside the data directory
pub const SPECIES_FILE: &str = "flower_names.json";

/// Ordered class list file name inside the data directory
pub const CLASSES_FILE: &str = "classes.json";

/// Classifier width used when neither table provides one
pub const DEFAULT_CLASS_WIDTH: usize = 102;

/// Resource loading errors
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Species table not readable ({}): {source}", .path.display())]
    SpeciesUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Species table malformed ({}): {source}", .path.display())]
    SpeciesMalformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Class list not readable ({}): {source}", .path.display())]
    ClassesUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Class list malformed ({}): {reason}", .path.display())]
    ClassesMalformed { path: PathBuf, reason: String },
}

/// Static metadata for one identifiable flower
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesRecord {
    pub species_id: String,
    /// Name shown to users (Chinese name in the shipped tables)
    pub local_name: String,
    /// Foreign name, reported as `scientificName`
    pub foreign_name: String,
}

/// On-disk entry of the species table
///
/// Accepts both camelCase and snake_case key names.
#[derive(Debug, Deserialize)]
struct SpeciesEntry {
    #[serde(default, alias = "localName", alias = "chinese_name")]
    local_name: Option<String>,
    #[serde(default, alias = "foreignName", alias = "english_name")]
    foreign_name: Option<String>,
}

/// Where the class order came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassOrderSource {
    /// Explicit ordered list matching training order
    Explicit,
    /// Sorted species ids (approximation)
    SortedKeys,
}

impl ClassOrderSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassOrderSource::Explicit => "explicit",
            ClassOrderSource::SortedKeys => "sorted-keys",
        }
    }
}

/// Ordered mapping class index (0..N-1) → species id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassIndexMap {
    species_ids: Vec<String>,
    source: ClassOrderSource,
}

impl ClassIndexMap {
    /// Build from an explicit, training-ordered list
    pub fn explicit(species_ids: Vec<String>) -> Self {
        Self {
            species_ids,
            source: ClassOrderSource::Explicit,
        }
    }

    /// Build from the species table's keys, sorted ascending
    pub fn from_sorted_keys<'a>(keys: impl IntoIterator<Item = &'a String>) -> Self {
        let mut species_ids: Vec<String> = keys.into_iter().cloned().collect();
        species_ids.sort();
        Self {
            species_ids,
            source: ClassOrderSource::SortedKeys,
        }
    }

    pub fn get(&self, class_index: usize) -> Option<&str> {
        self.species_ids.get(class_index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.species_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species_ids.is_empty()
    }

    pub fn source(&self) -> ClassOrderSource {
        self.source
    }

    pub fn species_ids(&self) -> &[String] {
        &self.species_ids
    }
}

/// Read-only snapshot of both lookup tables
///
/// Built once at startup, shared by reference with every request.
#[derive(Debug, Clone)]
pub struct SpeciesCatalog {
    species: BTreeMap<String, SpeciesRecord>,
    classes: ClassIndexMap,
}

impl SpeciesCatalog {
    pub fn new(species: BTreeMap<String, SpeciesRecord>, classes: ClassIndexMap) -> Self {
        Self { species, classes }
    }

    /// Catalog with no species: identification can only come from the cloud
    pub fn empty() -> Self {
        Self {
            species: BTreeMap::new(),
            classes: ClassIndexMap::from_sorted_keys(std::iter::empty()),
        }
    }

    /// Number of species in the table (reported as `flower_count`)
    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn species(&self, species_id: &str) -> Option<&SpeciesRecord> {
        self.species.get(species_id)
    }

    pub fn classes(&self) -> &ClassIndexMap {
        &self.classes
    }

    /// Species id at a classifier output position
    pub fn species_id_for(&self, class_index: usize) -> Option<&str> {
        self.classes.get(class_index)
    }

    /// Classifier output position → species record, if both tables agree
    pub fn resolve(&self, class_index: usize) -> Option<&SpeciesRecord> {
        self.species_id_for(class_index)
            .and_then(|id| self.species.get(id))
    }

    /// Output width the classifier must have
    ///
    /// Class list length when present, else species count, else
    /// [`DEFAULT_CLASS_WIDTH`].
    pub fn class_width(&self) -> usize {
        if !self.classes.is_empty() {
            self.classes.len()
        } else if !self.species.is_empty() {
            self.species.len()
        } else {
            DEFAULT_CLASS_WIDTH
        }
    }
}

/// Tables loaded at startup
#[derive(Debug)]
pub struct LoadedTables {
    pub catalog: SpeciesCatalog,
    /// Set when `classes.json` exists but can't be used. The catalog then has
    /// an empty class order: no class index resolves, and local inference
    /// must stay disabled.
    pub class_list_error: Option<LoadError>,
}

/// Load both tables from `data_dir`
///
/// Fails only when the species table can't be used. A missing class list
/// falls back to sorted species ids. A present but unreadable class list is
/// not guessed around: the species table is kept and the error is returned
/// alongside it.
pub fn load(data_dir: &Path) -> Result<LoadedTables, LoadError> {
    let species_path = data_dir.join(SPECIES_FILE);
    let species = load_species_table(&species_path)?;

    let classes_path = data_dir.join(CLASSES_FILE);
    let (classes, class_list_error) = if classes_path.exists() {
        match load_class_list(&classes_path) {
            Ok(ids) => (ClassIndexMap::explicit(ids), None),
            Err(e) => {
                tracing::error!(error = %e, "Class list unusable, local results will not resolve");
                (ClassIndexMap::explicit(Vec::new()), Some(e))
            }
        }
    } else {
        tracing::warn!(
            path = %classes_path.display(),
            "Class list not found, using sorted species ids as class order"
        );
        (ClassIndexMap::from_sorted_keys(species.keys()), None)
    };

    tracing::info!(
        species = species.len(),
        classes = classes.len(),
        order = classes.source().as_str(),
        "Species tables loaded"
    );

    Ok(LoadedTables {
        catalog: SpeciesCatalog::new(species, classes),
        class_list_error,
    })
}

fn load_species_table(path: &Path) -> Result<BTreeMap<String, SpeciesRecord>, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::SpeciesUnreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let entries: BTreeMap<String, SpeciesEntry> =
        serde_json::from_str(&content).map_err(|source| LoadError::SpeciesMalformed {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(entries
        .into_iter()
        .map(|(species_id, entry)| {
            let record = SpeciesRecord {
                species_id: species_id.clone(),
                local_name: entry.local_name.unwrap_or_else(|| "未知".to_string()),
                foreign_name: entry.foreign_name.unwrap_or_default(),
            };
            (species_id, record)
        })
        .collect())
}

fn load_class_list(path: &Path) -> Result<Vec<String>, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ClassesUnreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let malformed = |reason: String| LoadError::ClassesMalformed {
        path: path.to_path_buf(),
        reason,
    };

    let values: Vec<serde_json::Value> =
        serde_json::from_str(&content).map_err(|e| malformed(e.to_string()))?;

    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| match value {
            serde_json::Value::String(s) => Ok(s),
            serde_json::Value::Number(n) => Ok(n.to_string()),
            other => Err(malformed(format!("entry {} is not a string or number: {}", i, other))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) {
        std::fs::write(dir.path().join(name), content).unwrap();
    }

    #[test]
    fn test_sorted_keys_fallback_when_class_list_absent() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            SPECIES_FILE,
            r#"{
                "3": {"localName": "菊花", "foreignName": "Chrysanthemum"},
                "012": {"localName": "玫瑰", "foreignName": "Rose"},
                "1": {"localName": "郁金香", "foreignName": "Tulip"}
            }"#,
        );

        let catalog = load(dir.path()).unwrap().catalog;

        assert_eq!(catalog.classes().source(), ClassOrderSource::SortedKeys);
        assert_eq!(catalog.classes().species_ids(), &["012", "1", "3"]);
        assert_eq!(catalog.species_id_for(0), Some("012"));
        assert_eq!(catalog.class_width(), 3);
    }

    #[test]
    fn test_explicit_class_list_is_authoritative() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            SPECIES_FILE,
            r#"{"164": {"chinese_name": "荷花", "english_name": "Lotus"},
                "21": {"chinese_name": "牡丹", "english_name": "Peony"}}"#,
        );
        write(&dir, CLASSES_FILE, r#"[164, "21"]"#);

        let catalog = load(dir.path()).unwrap().catalog;

        assert_eq!(catalog.classes().source(), ClassOrderSource::Explicit);
        assert_eq!(catalog.resolve(0).unwrap().local_name, "荷花");
        assert_eq!(catalog.resolve(1).unwrap().foreign_name, "Peony");
        assert!(catalog.resolve(2).is_none());
    }

    #[test]
    fn test_class_width_prefers_class_list_length() {
        let dir = TempDir::new().unwrap();
        write(&dir, SPECIES_FILE, r#"{"1": {"localName": "a"}, "2": {"localName": "b"}}"#);
        write(&dir, CLASSES_FILE, r#"["1", "2", "3", "4"]"#);

        let catalog = load(dir.path()).unwrap().catalog;

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.class_width(), 4);
        // Stale entry: index 3 names a species the table doesn't have
        assert_eq!(catalog.species_id_for(3), Some("4"));
        assert!(catalog.resolve(3).is_none());
    }

    #[test]
    fn test_missing_names_default() {
        let dir = TempDir::new().unwrap();
        write(&dir, SPECIES_FILE, r#"{"7": {}}"#);

        let catalog = load(dir.path()).unwrap().catalog;
        let record = catalog.species("7").unwrap();

        assert_eq!(record.local_name, "未知");
        assert_eq!(record.foreign_name, "");
    }

    #[test]
    fn test_missing_species_table_fails() {
        let dir = TempDir::new().unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::SpeciesUnreadable { .. }));
    }

    #[test]
    fn test_malformed_class_list_keeps_species() {
        let dir = TempDir::new().unwrap();
        write(&dir, SPECIES_FILE, r#"{"1": {"localName": "a"}, "2": {"localName": "b"}}"#);
        write(&dir, CLASSES_FILE, r#"[["nested"]]"#);

        let tables = load(dir.path()).unwrap();

        assert!(matches!(
            tables.class_list_error,
            Some(LoadError::ClassesMalformed { .. })
        ));
        assert_eq!(tables.catalog.len(), 2);
        assert!(tables.catalog.classes().is_empty());
        assert!(tables.catalog.resolve(0).is_none());
    }

    #[test]
    fn test_valid_tables_have_no_class_list_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, SPECIES_FILE, r#"{"1": {"localName": "a"}}"#);
        write(&dir, CLASSES_FILE, r#"["1"]"#);

        assert!(load(dir.path()).unwrap().class_list_error.is_none());
    }

    #[test]
    fn test_empty_catalog_uses_default_width() {
        let catalog = SpeciesCatalog::empty();
        assert_eq!(catalog.len(), 0);
        assert_eq!(catalog.class_width(), DEFAULT_CLASS_WIDTH);
    }
}
