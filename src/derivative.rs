//! Turning a base compound into its derivative and describing it.

use std::fmt::{Display, Formatter, Result as FmtResult};

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, info};

use crate::*;

/// The only base that gets modified.
pub const ASPIRIN: &str = "aspirin";
/// Matches the acetyl carbonyl and its ester oxygen.
pub const ACETYL_PATTERN: &str = "C(=O)O";
/// Put in place of the first acetyl match, lengthening it to propionyl.
pub const PROPIONYL_REPLACEMENT: &str = "CC(=O)O";
pub const DEFAULT_DISEASE: &str = "unspecified";

#[derive(Error, Debug, PartialEq)]
pub enum DeriveError {
    #[error("Pattern {0} does not occur in base '{1}'")]
    NoMatch(String, String),
    #[error("Unknown base")]
    UnknownBase(String),
}

/// Apply the fixed modification for `base`. Only aspirin changes; every
/// other base comes back as it went in.
pub fn transform(base: &BaseCompound, molecule: Molecule) -> Result<Molecule> {
    if base.key != ASPIRIN {
        debug!("No modification for {}", base.key);
        return Ok(molecule);
    }

    let pattern = Pattern::parse(ACETYL_PATTERN)?;
    let replacement = Molecule::from_smiles(PROPIONYL_REPLACEMENT)?;
    let products = replace_substructs(&molecule, &pattern, &replacement, false);
    debug!("{} product(s) for {}", products.len(), base.key);
    products
        .into_iter()
        .next()
        .ok_or_else(|| DeriveError::NoMatch(ACETYL_PATTERN.to_string(), base.key.clone()).into())
}

/// What gets printed for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub disease: String,
    pub smiles: String,
    pub descriptors: Descriptors,
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(f, "Generated SMILES for {}: {}", self.disease, self.smiles)?;
        writeln!(f, "Molecular Weight: {:?}", self.descriptors.molecular_weight)?;
        write!(f, "LogP: {:?}", self.descriptors.logp)
    }
}

/// Load, modify and describe a base compound.
pub fn derive(base: &BaseCompound, disease: &str) -> Result<Report> {
    let molecule = base.molecule()?;
    let derivative = transform(base, molecule)
        .with_context(|| format!("Failed to derive a structure from {}", base.key))?;
    let smiles = derivative.to_smiles();
    let descriptors = Descriptors::of(&derivative);
    info!("{} ({}): {} {}", base.key, base.name, smiles, descriptors);
    Ok(Report {
        disease: disease.to_string(),
        smiles,
        descriptors,
    })
}

/// Like [`derive`], looking the base up by key first.
pub fn derive_named(table: &BaseTable, key: &str, disease: &str) -> Result<Report> {
    let base = table
        .get(key)
        .ok_or_else(|| DeriveError::UnknownBase(key.to_string()))?;
    derive(base, disease)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(key: &str) -> Report {
        derive_named(BaseTable::builtin(), key, DEFAULT_DISEASE)
            .unwrap_or_else(|e| panic!("derive {key:?}: {e:#}"))
    }

    fn canonical(smiles: &str) -> String {
        Molecule::from_smiles(smiles).unwrap().to_smiles()
    }

    #[test]
    fn aspirin_is_modified() {
        let report = report("aspirin");
        assert_eq!(report.smiles, "CCC(=O)O.O=C(O)c1ccccc1");
        assert_ne!(report.smiles, canonical("CC(=O)OC1=CC=CC=C1C(=O)O"));
        assert!((report.descriptors.molecular_weight - 196.202).abs() < 1e-3);
        assert!((report.descriptors.logp - 1.8658).abs() < 1e-3);
    }

    #[test]
    fn other_bases_are_unchanged() {
        for key in ["penicillin", "ibuprofen"] {
            let base = BaseTable::builtin().get(key).unwrap();
            assert_eq!(report(key).smiles, canonical(&base.smiles), "{key}");
        }
    }

    #[test]
    fn descriptors_are_plausible() {
        for key in ["aspirin", "penicillin", "ibuprofen"] {
            let d = report(key).descriptors;
            assert!(d.molecular_weight > 100.0 && d.molecular_weight < 400.0, "{key}");
            assert!(d.logp.is_finite(), "{key}");
        }
    }

    #[test]
    fn unknown_base() {
        let err = derive_named(BaseTable::builtin(), "unobtainium", "flu").unwrap_err();
        assert_eq!(
            err.downcast_ref::<DeriveError>(),
            Some(&DeriveError::UnknownBase("unobtainium".to_string()))
        );
        assert_eq!(err.to_string(), "Unknown base");
    }

    #[test]
    fn aspirin_without_the_pattern_fails() {
        let base = BaseCompound {
            key: ASPIRIN.to_string(),
            name: "Not aspirin".to_string(),
            smiles: "CCCC".to_string(),
        };
        let err = derive(&base, DEFAULT_DISEASE).unwrap_err();
        assert!(err
            .chain()
            .any(|cause| cause.downcast_ref::<DeriveError>().is_some()));
    }

    #[test]
    fn report_has_three_lines() {
        let report = Report {
            disease: "headache".to_string(),
            smiles: "CCO".to_string(),
            descriptors: Descriptors {
                molecular_weight: 46.069,
                logp: -0.0014,
                molar_refractivity: 12.76,
                formula: "C2H6O".to_string(),
            },
        };
        assert_eq!(
            report.to_string(),
            "Generated SMILES for headache: CCO\nMolecular Weight: 46.069\nLogP: -0.0014"
        );
    }

    #[test]
    fn whole_numbers_keep_a_decimal_point() {
        let report = Report {
            disease: DEFAULT_DISEASE.to_string(),
            smiles: "C".to_string(),
            descriptors: Descriptors {
                molecular_weight: 16.0,
                logp: 1.0,
                molar_refractivity: 0.0,
                formula: "CH4".to_string(),
            },
        };
        assert!(report.to_string().ends_with("Molecular Weight: 16.0\nLogP: 1.0"));
    }
}
