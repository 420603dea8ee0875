use std::fmt::{Display, Formatter, Result as FmtResult};

use tracing::debug;

use crate::*;

/// Mass of one atom: its isotope's mass when labelled, otherwise the
/// element's average weight.
fn atom_mass(atom: &Atom) -> f64 {
    match atom.isotope {
        Some(mass_number) => atom.element.isotope_mass(mass_number).unwrap_or_else(|| {
            debug!("No mass for {}{}, using the average weight", mass_number, atom.element);
            atom.element.atomic_weight()
        }),
        None => atom.element.atomic_weight(),
    }
}

/// Molecular weight, counting every carried hydrogen. Carried hydrogens
/// always take the average weight of hydrogen.
pub fn mol_wt(molecule: &Molecule) -> f64 {
    let graph = molecule.graph();
    graph
        .node_indices()
        .map(|node| {
            atom_mass(&graph[node])
                + molecule.hydrogen_count(node) as f64 * Element::H.atomic_weight()
        })
        .sum()
}

/// The descriptors computed for a structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptors {
    pub molecular_weight: f64,
    pub logp: f64,
    pub molar_refractivity: f64,
    pub formula: String,
}

impl Descriptors {
    pub fn of(molecule: &Molecule) -> Self {
        let (logp, molar_refractivity) = crippen_logp_mr(molecule);
        Self {
            molecular_weight: mol_wt(molecule),
            logp,
            molar_refractivity,
            formula: molecule.formula(),
        }
    }
}

impl Display for Descriptors {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{} MW={:.3} LogP={:.4} MR={:.3}",
            self.formula, self.molecular_weight, self.logp, self.molar_refractivity
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mol(smiles: &str) -> Molecule {
        Molecule::from_smiles(smiles).unwrap_or_else(|e| panic!("bad SMILES {smiles:?}: {e}"))
    }

    #[test]
    fn aspirin_weight() {
        let mw = mol_wt(&mol("CC(=O)OC1=CC=CC=C1C(=O)O"));
        assert!((mw - 180.159).abs() < 1e-3, "{mw}");
    }

    #[test]
    fn penicillin_weight() {
        let mw = mol_wt(&mol("CC1(C)SC2C(NC(=O)CC3=CC=CC=C3)C(=O)N2C1C(=O)O"));
        assert!((mw - 334.397).abs() < 1e-2, "{mw}");
    }

    #[test]
    fn bracket_hydrogens_count_towards_weight() {
        let water = mol("[OH2]");
        assert!((mol_wt(&water) - 18.015).abs() < 1e-3);
        let hydroxide = mol("[OH-]");
        assert!((mol_wt(&hydroxide) - 17.007).abs() < 1e-3);
    }

    #[test]
    fn isotope_labels_change_the_weight() {
        let weight = |smiles: &str| mol_wt(&mol(smiles));
        assert!((weight("C") - 16.043).abs() < 1e-3);
        assert!((weight("[13CH4]") - 17.035).abs() < 1e-3);
        assert!((weight("[2H]C") - 17.049).abs() < 1e-3);
        assert!((weight("[2H]O[2H]") - 20.027).abs() < 1e-3);
        // Unknown mass numbers fall back to the average weight.
        assert!((weight("[99CH4]") - 16.043).abs() < 1e-3);
    }

    #[test]
    fn descriptors_bundle() {
        let descriptors = Descriptors::of(&mol("CCC(=O)O.O=C(O)c1ccccc1"));
        assert_eq!(descriptors.formula, "C10H12O4");
        assert!((descriptors.molecular_weight - 196.202).abs() < 1e-3);
        assert!((descriptors.logp - 1.8658).abs() < 1e-3);
        assert!(descriptors.to_string().starts_with("C10H12O4 MW=196.202"));
    }
}
