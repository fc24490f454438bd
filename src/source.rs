// Data Source
//
// Stand-in for the promotion's `get_data` loader: every entity is a table
// fetched by name.
use crate::error::{Error, Result};
use crate::tx;
use polars::prelude::*;
use std::path::{Path, PathBuf};

/// Columns read as text from CSV, whatever they look like.
const TEXT_COLUMNS: [&str; 2] = ["phone", "created_at"];

/// Tables keyed by entity name, in the order they were requested.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    entries: Vec<(String, DataFrame)>,
}

impl Tables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table, replacing any previous table of the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, table: DataFrame) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = table,
            None => self.entries.push((name, table)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&DataFrame> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    /// Removes and returns the table for `name`.
    pub fn take(&mut self, name: &str) -> Result<DataFrame> {
        let idx = self
            .entries
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| Error::MissingData(format!("no table for entity '{name}'")))?;
        Ok(self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataFrame)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, DataFrame)> for Tables {
    fn from_iter<I: IntoIterator<Item = (String, DataFrame)>>(iter: I) -> Self {
        let mut tables = Tables::new();
        for (name, table) in iter {
            tables.insert(name, table);
        }
        tables
    }
}

pub trait DataSource {
    /// Fetches one table per entity name. A name with no table is `MissingData`.
    fn get_data(&self, entities: &[&str]) -> Result<Tables>;
}

/// A directory holding one `<entity>.parquet` or `<entity>.csv` per entity.
#[derive(Debug, Clone)]
pub struct TableDir {
    dir: PathBuf,
}

impl TableDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Parquet wins over CSV when both exist.
    pub fn read_entity(&self, entity: &str) -> Result<DataFrame> {
        let parquet = self.dir.join(format!("{entity}.parquet"));
        if parquet.is_file() {
            return read_parquet(&parquet);
        }

        let csv = self.dir.join(format!("{entity}.csv"));
        if csv.is_file() {
            return read_csv(&csv);
        }

        Err(Error::MissingData(format!(
            "no table for entity '{entity}' in {}",
            self.dir.display()
        )))
    }
}

impl DataSource for TableDir {
    fn get_data(&self, entities: &[&str]) -> Result<Tables> {
        let mut tables = Tables::new();
        for entity in entities {
            let table = self.read_entity(entity)?;
            tracing::debug!(entity, rows = table.height(), cols = table.width(), "table loaded");
            tables.insert(*entity, table);
        }
        Ok(tables)
    }
}

/// Serves tables that are already in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: Tables,
}

impl MemorySource {
    pub fn new(tables: Tables) -> Self {
        Self { tables }
    }
}

impl DataSource for MemorySource {
    fn get_data(&self, entities: &[&str]) -> Result<Tables> {
        entities
            .iter()
            .map(|entity| {
                self.tables
                    .get(entity)
                    .map(|t| (entity.to_string(), t.clone()))
                    .ok_or_else(|| Error::MissingData(format!("no table for entity '{entity}'")))
            })
            .collect()
    }
}

pub fn read_parquet(path: &Path) -> Result<DataFrame> {
    Ok(ParquetReader::new(std::fs::File::open(path)?)
        .use_statistics(true)
        .finish()?)
}

pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let header = csv_options()
        .with_n_rows(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    // Only overwrite columns the file has; polars maps a full-width overwrite by position
    let mut overwrite = Schema::with_capacity(TEXT_COLUMNS.len());
    for name in TEXT_COLUMNS.iter().filter(|c| tx::has_column(&header, c)) {
        overwrite.insert(PlSmallStr::from_str(name), DataType::String);
    }
    let overwrite = (!overwrite.is_empty()).then(|| Arc::new(overwrite));

    Ok(csv_options()
        .with_schema_overwrite(overwrite)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?)
}

fn csv_options() -> CsvReadOptions {
    CsvReadOptions::default().with_has_header(true)
}
