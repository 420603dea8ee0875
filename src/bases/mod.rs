//! The table of known base compounds.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use lazy_static::lazy_static;
use thiserror::Error;
use tracing::{debug, info};

use crate::Molecule;

/// Environment variable naming a CSV file to load instead of the built-in
/// table.
pub const BASES_ENV: &str = "DRUGSIM_BASES";

#[derive(Error, Debug)]
pub enum BaseTableError {
    #[error("Could not read base table: {0}")]
    Csv(#[from] csv::Error),
    #[error("Record {0} has no '{1}' column")]
    MissingColumn(usize, &'static str),
    #[error("Record {0} has an empty '{1}' field")]
    EmptyField(usize, &'static str),
    #[error("Base '{0}' is listed more than once")]
    DuplicateKey(String),
}

/// One named starting structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseCompound {
    pub key: String,
    pub name: String,
    pub smiles: String,
}

impl BaseCompound {
    pub fn molecule(&self) -> Result<Molecule> {
        Molecule::from_smiles(&self.smiles)
            .with_context(|| format!("Failed to load base '{}'", self.key))
    }
}

/// Base compounds by key. Keys are matched exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseTable(BTreeMap<String, BaseCompound>);

fn field<'r>(
    record: &'r StringRecord,
    index: usize,
    line: usize,
    column: &'static str,
) -> Result<&'r str, BaseTableError> {
    let value = record
        .get(index)
        .ok_or(BaseTableError::MissingColumn(line, column))?
        .trim();
    if value.is_empty() {
        return Err(BaseTableError::EmptyField(line, column));
    }
    Ok(value)
}

impl BaseTable {
    /// Parse `key,name,smiles` records. The first line is a header.
    pub fn from_csv(data: &str) -> Result<Self, BaseTableError> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(data.as_bytes());
        let mut table = BTreeMap::new();
        for (i, result) in rdr.records().enumerate() {
            let record = result?;
            let line = i + 1;
            let compound = BaseCompound {
                key: field(&record, 0, line, "key")?.to_string(),
                name: field(&record, 1, line, "name")?.to_string(),
                smiles: field(&record, 2, line, "smiles")?.to_string(),
            };
            if table.contains_key(&compound.key) {
                return Err(BaseTableError::DuplicateKey(compound.key));
            }
            debug!("Base {} -> {}", compound.key, compound.smiles);
            table.insert(compound.key.clone(), compound);
        }
        Ok(Self(table))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read base table {}", path.display()))?;
        Self::from_csv(&data).with_context(|| format!("Invalid base table {}", path.display()))
    }

    /// The table compiled into the crate.
    pub fn builtin() -> &'static BaseTable {
        &BUILTIN_BASES
    }

    /// The table named by `DRUGSIM_BASES`, or the built-in one.
    pub fn load() -> Result<BaseTable> {
        match std::env::var_os(BASES_ENV) {
            Some(path) => {
                info!("Loading base table from {}", Path::new(&path).display());
                Self::from_path(path)
            }
            None => Ok(Self::builtin().clone()),
        }
    }

    pub fn get(&self, key: &str) -> Option<&BaseCompound> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

lazy_static! {
    static ref BUILTIN_BASES: BaseTable = BaseTable::from_csv(include_str!("bases.csv"))
        .unwrap_or_else(|e| panic!("built-in base table bases.csv is invalid: {e}"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_three_bases() {
        let table = BaseTable::builtin();
        assert_eq!(
            table.keys().collect::<Vec<_>>(),
            vec!["aspirin", "ibuprofen", "penicillin"]
        );
        assert_eq!(
            table.get("aspirin").map(|b| b.smiles.as_str()),
            Some("CC(=O)OC1=CC=CC=C1C(=O)O")
        );
        assert_eq!(
            table.get("penicillin").map(|b| b.name.as_str()),
            Some("Beta-lactam antibiotic derivative")
        );
    }

    #[test]
    fn builtin_csv_is_valid() {
        let table = BaseTable::from_csv(include_str!("bases.csv"))
            .unwrap_or_else(|e| panic!("bases.csv: {e}"));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn lookup_is_exact() {
        let table = BaseTable::builtin();
        assert!(table.get("Aspirin").is_none());
        assert!(table.get(" aspirin").is_none());
        assert!(table.get("unobtainium").is_none());
    }

    #[test]
    fn every_builtin_base_parses() {
        for key in BaseTable::builtin().keys() {
            let base = BaseTable::builtin().get(key).unwrap();
            assert!(base.molecule().is_ok(), "{key}");
        }
    }

    #[test]
    fn custom_table() {
        let table = BaseTable::from_csv("key,name,smiles\nethanol,Ethanol,CCO\n").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("ethanol").unwrap().smiles, "CCO");
    }

    #[test]
    fn malformed_tables() {
        assert!(matches!(
            BaseTable::from_csv("key,name,smiles\nethanol,Ethanol,\n"),
            Err(BaseTableError::EmptyField(1, "smiles"))
        ));
        assert!(matches!(
            BaseTable::from_csv("key,name,smiles\na,A,C\na,B,CC\n"),
            Err(BaseTableError::DuplicateKey(key)) if key == "a"
        ));
        assert!(matches!(
            BaseTable::from_csv("key,name,smiles\na,A,C,extra\n"),
            Err(BaseTableError::Csv(_))
        ));
    }
}
