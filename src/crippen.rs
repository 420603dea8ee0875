//! Wildman–Crippen atom typing for LogP and molar refractivity.
//!
//! Every atom, hydrogens included, is given the first type in the table
//! whose SMARTS matches with the pattern's first atom on it. A type may
//! list several patterns. The table order matters: specific types sit
//! ahead of the catch-all `CS`, `HS`, `NS` and `OS` entries.

use lazy_static::lazy_static;
use petgraph::graph::NodeIndex;
use tracing::{debug, error, trace};

use crate::*;

struct CrippenRule {
    label: &'static str,
    smarts: &'static [&'static str],
    logp: f64,
    mr: f64,
}

macro_rules! rule {
    ($label:literal, [$($smarts:literal),+ $(,)?], $logp:expr, $mr:expr) => {
        CrippenRule {
            label: $label,
            smarts: &[$($smarts),+],
            logp: $logp,
            mr: $mr,
        }
    };
}

const CRIPPEN_RULES: &[CrippenRule] = &[
    rule!("C1", ["[CH4]", "[CH3]C", "[CH2](C)C"], 0.1441, 2.503),
    rule!("C2", ["[CH](C)(C)C", "[C](C)(C)(C)C"], 0.0, 2.433),
    rule!(
        "C3",
        ["[CH3][N,O,P,S,F,Cl,Br,I]", "[CH2X4]([N,O,P,S,F,Cl,Br,I])[A;!#1]"],
        -0.2035,
        2.753
    ),
    rule!(
        "C4",
        [
            "[CH1X4]([N,O,P,S,F,Cl,Br,I])([A;!#1])[A;!#1]",
            "[CH0X4]([N,O,P,S,F,Cl,Br,I])([A;!#1])([A;!#1])[A;!#1]",
        ],
        -0.2051,
        2.731
    ),
    rule!("C5", ["[C]=[!C;A;!#1]"], -0.2783, 5.007),
    rule!(
        "C6",
        [
            "[CH2]=C",
            "[CH1](=C)[A;!#1]",
            "[CH0](=C)([A;!#1])[A;!#1]",
            "[C](=C)=C",
        ],
        0.1551,
        3.513
    ),
    rule!("C7", ["[CX2]#[A]"], 0.0017, 3.888),
    rule!("C8", ["[CH3]c"], 0.08452, 2.464),
    rule!("C9", ["[CH3]a"], -0.1444, 2.412),
    rule!("C10", ["[CH2X4]a"], -0.0516, 2.488),
    rule!("C11", ["[CHX4]a"], 0.1193, 2.582),
    rule!("C12", ["[CH0X4]a"], -0.0967, 2.576),
    rule!("C13", ["[cH0]-[A;!C;!N;!O;!S;!F;!Cl;!Br;!I;!#1]"], -0.5443, 4.041),
    rule!("C14", ["[c][#9]"], 0.0, 3.257),
    rule!("C15", ["[c][#17]"], 0.245, 3.564),
    rule!("C16", ["[c][#35]"], 0.198, 3.18),
    rule!("C17", ["[c][#53]"], 0.0, 3.104),
    rule!("C18", ["[cH]"], 0.1581, 3.35),
    rule!("C19", ["[c](:a)(:a):a"], 0.2955, 4.346),
    rule!("C20", ["[c](:a)(:a)-a"], 0.2713, 3.904),
    rule!("C21", ["[c](:a)(:a)-C"], 0.136, 3.509),
    rule!("C22", ["[c](:a)(:a)-N"], 0.4619, 3.067),
    rule!("C23", ["[c](:a)(:a)-O"], 0.5437, 3.853),
    rule!("C24", ["[c](:a)(:a)-S"], 0.1893, 2.673),
    rule!("C25", ["[c](:a)(:a)=[C,N,O]"], -0.8186, 3.135),
    rule!(
        "C26",
        ["[C](=C)(a)[A;!#1]", "[C](=C)(c)a", "[CH1](=C)a", "[C]=c"],
        0.264,
        4.305
    ),
    rule!("C27", ["[CX4][A;!C;!N;!O;!P;!S;!F;!Cl;!Br;!I;!#1]"], 0.2148, 2.693),
    rule!("CS", ["[#6]"], 0.08129, 3.243),
    rule!("H1", ["[#1][#6]", "[#1][#1]"], 0.123, 1.057),
    rule!(
        "H2",
        [
            "[#1]O[CX4]",
            "[#1]Oc",
            "[#1]O[!#6;!#7;!#8;!#16]",
            "[#1][!#6;!#7;!#8]",
        ],
        -0.2677,
        1.395
    ),
    rule!("H3", ["[#1][#7]", "[#1]O[#7]"], 0.2142, 0.9627),
    rule!(
        "H4",
        [
            "[#1]OC=[#6]",
            "[#1]OC=[#7]",
            "[#1]OC=O",
            "[#1]OC=S",
            "[#1]OO",
            "[#1]OS",
        ],
        0.298,
        1.805
    ),
    rule!("HS", ["[#1]"], 0.1125, 1.112),
    rule!("N1", ["[NH2+0][A;!#1]"], -1.019, 2.262),
    rule!("N2", ["[NH+0]([A;!#1])[A;!#1]"], -0.7096, 2.173),
    rule!("N3", ["[NH2+0]a"], -1.027, 2.827),
    rule!("N4", ["[NH+0](a)[A;!#1]"], -0.5188, 3.0),
    rule!("N5", ["[NH+0]=[!#1]"], 0.08387, 1.757),
    rule!("N6", ["[N+0](=[!#1])[!#1]"], 0.1836, 2.428),
    rule!("N7", ["[N+0]([A;!#1])([A;!#1])[A;!#1]"], -0.3187, 1.839),
    rule!(
        "N8",
        ["[N+0](a)([!#1])[A;!#1]", "[N+0](a)(a)a"],
        -0.4458,
        2.819
    ),
    rule!("N9", ["[N+0]#[A;!#1]"], 0.01508, 1.725),
    rule!("N10", ["[NH3,NH2,NH;+,+2,+3]"], -1.95, 0.0),
    rule!("N11", ["[n+0]"], -0.3239, 2.202),
    rule!("N12", ["[n;+,+2,+3]"], -1.119, 0.0),
    rule!(
        "N13",
        [
            "[NH0;+,+2,+3]([A;!#1])([A;!#1])([A;!#1])[A;!#1]",
            "[NH0;+,+2,+3](=[A;!#1])([A;!#1])[!#1]",
            "[NH0;+,+2,+3](=[#6])=[#7]",
        ],
        -0.3396,
        0.2604
    ),
    rule!(
        "N14",
        [
            "[N;+,+2,+3]#[A;!#1]",
            "[N;-,-2,-3]",
            "[N;+,+2,+3](=[N;-,-2,-3])=N",
        ],
        0.2887,
        3.359
    ),
    rule!("NS", ["[#7]"], -0.4806, 2.134),
    rule!("O1", ["[o]"], 0.1552, 1.08),
    rule!("O2", ["[OH,OH2]"], -0.2893, 0.8238),
    rule!("O3", ["[O]([A;!#1])[A;!#1]"], -0.0684, 1.085),
    rule!("O4", ["[O](a)[A;!#1]", "[O](a)a"], -0.4195, 1.182),
    rule!("O5", ["[O]=[#7,#8]", "[OX1-][#7]"], 0.0335, 3.367),
    rule!("O6", ["[OX1-][#16]"], -0.3339, 0.7774),
    rule!("O12", ["[O-]C(=O)"], -1.326, 0.0),
    rule!("O7", ["[OX1-]"], -1.189, 0.0),
    rule!("O8", ["[O]=c"], 0.1788, 3.135),
    rule!(
        "O9",
        [
            "[O]=[CH]C",
            "O=C(C)[A;!#1]",
            "[O]=[CH][N,O]",
            "[O]=[CH2]",
            "[O]=[CX2]=O",
        ],
        -0.1526,
        0.0
    ),
    rule!(
        "O10",
        ["[O]=[CH]c", "O=C([C,c])[a;!#1]", "O=C(c)[A;!#1]"],
        0.1129,
        0.2215
    ),
    rule!("O11", ["[O]=C([!#1;!#6])[!#1;!#6]"], 0.4833, 0.389),
    rule!("OS", ["[#8]"], -0.1188, 0.6865),
    rule!("F", ["[#9-0]"], 0.4202, 1.108),
    rule!("Cl", ["[#17-0]"], 0.6895, 5.853),
    rule!("Br", ["[#35-0]"], 0.8456, 8.927),
    rule!("I", ["[#53-0]"], 0.8857, 14.02),
    rule!("Hal", ["[#9,#17,#35,#53;-]"], -2.996, 3.034),
    rule!("P", ["[#15]"], 0.8612, 6.92),
    rule!("S1", ["[S-0]"], 0.6482, 7.591),
    rule!("S2", ["[S;!+0]"], -0.0024, 7.365),
    rule!("S3", ["[s]"], 0.6237, 6.691),
    rule!("Me1", ["[#3,#11,#19]"], -0.3808, 5.754),
    rule!("Me2", ["[#12,#20]"], -0.0025, 0.0),
];

/// A Crippen atom type with its parsed patterns.
pub struct AtomType {
    pub label: &'static str,
    pub patterns: Vec<Pattern>,
    pub logp: f64,
    pub mr: f64,
}

lazy_static! {
    static ref ATOM_TYPES: Vec<AtomType> = CRIPPEN_RULES
        .iter()
        .filter_map(|rule| {
            let patterns: anyhow::Result<Vec<Pattern>> =
                rule.smarts.iter().map(|smarts| Pattern::parse(smarts)).collect();
            match patterns {
                Ok(patterns) => Some(AtomType {
                    label: rule.label,
                    patterns,
                    logp: rule.logp,
                    mr: rule.mr,
                }),
                Err(e) => {
                    error!("Dropping Crippen type {}: {:#}", rule.label, e);
                    None
                }
            }
        })
        .collect();
}

/// The ordered Crippen type table.
pub fn atom_types() -> &'static [AtomType] {
    &ATOM_TYPES
}

/// One atom's share of LogP and MR. `label` is `None` for atoms no type
/// matched; they contribute zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrippenContribution {
    pub label: Option<&'static str>,
    pub logp: f64,
    pub mr: f64,
}

/// Type every atom of a molecule whose hydrogens are already graph nodes.
fn type_atoms(molecule: &Molecule) -> Vec<CrippenContribution> {
    let target = MatchTarget::new(molecule);
    molecule
        .graph()
        .node_indices()
        .map(|node| {
            let found = ATOM_TYPES.iter().find(|atom_type| {
                atom_type
                    .patterns
                    .iter()
                    .any(|pattern| target.matches_at(pattern, node))
            });
            match found {
                Some(atom_type) => {
                    trace!("Atom {} typed {}", node.index(), atom_type.label);
                    CrippenContribution {
                        label: Some(atom_type.label),
                        logp: atom_type.logp,
                        mr: atom_type.mr,
                    }
                }
                None => {
                    debug!(
                        "No Crippen type for atom {} ({})",
                        node.index(),
                        molecule.graph()[node].element
                    );
                    CrippenContribution {
                        label: None,
                        logp: 0.0,
                        mr: 0.0,
                    }
                }
            }
        })
        .collect()
}

/// Per-atom contributions. Entries line up with the molecule's atoms; the
/// contributions of each atom's hydrogens are folded into it.
pub fn crippen_contribs(molecule: &Molecule) -> Vec<CrippenContribution> {
    let explicit = molecule.with_explicit_hydrogens();
    let typed = type_atoms(&explicit);

    let mut contribs: Vec<CrippenContribution> = typed[..molecule.atom_count()].to_vec();
    for (index, contribution) in typed.iter().enumerate().skip(molecule.atom_count()) {
        // Added hydrogens carry exactly one bond, back to their heavy atom.
        let hydrogen = NodeIndex::new(index);
        if let Some(heavy) = explicit.graph().neighbors(hydrogen).next() {
            contribs[heavy.index()].logp += contribution.logp;
            contribs[heavy.index()].mr += contribution.mr;
        }
    }
    contribs
}

/// Wildman–Crippen LogP and molar refractivity.
pub fn crippen_logp_mr(molecule: &Molecule) -> (f64, f64) {
    let explicit = molecule.with_explicit_hydrogens();
    type_atoms(&explicit)
        .iter()
        .fold((0.0, 0.0), |(logp, mr), c| (logp + c.logp, mr + c.mr))
}

pub fn mol_logp(molecule: &Molecule) -> f64 {
    crippen_logp_mr(molecule).0
}

pub fn mol_mr(molecule: &Molecule) -> f64 {
    crippen_logp_mr(molecule).1
}
