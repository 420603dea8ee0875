use std::collections::BTreeMap;

use anyhow::{Context, Result};
use petgraph::graph::NodeIndex;
use thiserror::Error;
use tracing::trace;

use crate::*;

#[derive(Error, Debug, PartialEq)]
pub enum SmilesError {
    #[error("Empty SMILES string")]
    Empty,
    #[error("Branch start '(' at position {0} without a current atom")]
    BranchNoCurrentAtom(usize),
    #[error("Branch end ')' at position {0} without a matching '('")]
    BranchEndNoStart(usize),
    #[error("Branch opened but never closed")]
    UnclosedBranch,
    #[error("Bond symbol at position {0} without a preceding atom")]
    BondWithoutAtom(usize),
    #[error("Bond symbol at position {0} is not followed by an atom")]
    DanglingBond(usize),
    #[error("Ring closure digit '{0}' at position {1} without a current atom")]
    RingClosureNoCurrentAtom(char, usize),
    #[error("Ring closure {0} at position {1} would bond an atom to itself or duplicate a bond")]
    InvalidRingClosure(u8, usize),
    #[error("Ring closure {0} has conflicting bond symbols")]
    ConflictingRingBonds(u8),
    #[error("Ring closure {0} is never closed")]
    UnclosedRing(u8),
    #[error("Incomplete ring closure after '%' at position {0}")]
    IncompleteRingLabel(usize),
    #[error("Unclosed bracket '[' at position {0}")]
    UnclosedBracket(usize),
    #[error("Invalid bracket atom [{0}]")]
    InvalidBracketAtom(String),
    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),
    #[error("Atom {0} is written aromatic but is not in an aromatic ring")]
    NotAromatic(usize),
}

/// Parses a SMILES string into a MoleculeGraph.
///
/// Aromaticity is perceived on the result, so a Kekulé ring and its
/// lowercase spelling give the same graph.
pub fn parse_smiles(smiles: &str) -> Result<MoleculeGraph> {
    let mut graph = parse_smiles_helper(smiles)
        .context(format!("Failed to parse SMILES string {smiles}"))?;
    let aromatic_atoms = perceive_aromaticity(&mut graph);
    if let Some(node) = graph
        .node_indices()
        .find(|node| graph[*node].aromatic && !aromatic_atoms.contains(node))
    {
        return Err(SmilesError::NotAromatic(node.index()))
            .context(format!("Failed to parse SMILES string {smiles}"));
    }
    trace!(
        "Parsed {smiles} into {} atoms and {} bonds",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

/// The bond written between two atoms when no symbol is given.
fn implicit_bond(graph: &MoleculeGraph, a: NodeIndex, b: NodeIndex) -> Bond {
    if graph[a].aromatic && graph[b].aromatic {
        Bond::Aromatic
    } else {
        Bond::Single
    }
}

fn add_atom(
    graph: &mut MoleculeGraph,
    previous: Option<NodeIndex>,
    bond: Option<Bond>,
    atom: Atom,
) -> NodeIndex {
    let node = graph.add_node(atom);
    if let Some(prev) = previous {
        let bond = bond.unwrap_or_else(|| implicit_bond(graph, prev, node));
        graph.add_edge(prev, node, bond);
    }
    node
}

/// An unbracketed atom from the organic subset, and how many characters it
/// spans.
fn organic_atom(chars: &[char]) -> Option<(Atom, usize)> {
    match chars {
        ['C', 'l', ..] => return Some((Atom::new(Element::Cl), 2)),
        ['B', 'r', ..] => return Some((Atom::new(Element::Br), 2)),
        _ => {}
    }
    let atom = match chars.first()? {
        'B' => Atom::new(Element::B),
        'C' => Atom::new(Element::C),
        'N' => Atom::new(Element::N),
        'O' => Atom::new(Element::O),
        'P' => Atom::new(Element::P),
        'S' => Atom::new(Element::S),
        'F' => Atom::new(Element::F),
        'I' => Atom::new(Element::I),
        'b' => Atom::aromatic(Element::B),
        'c' => Atom::aromatic(Element::C),
        'n' => Atom::aromatic(Element::N),
        'o' => Atom::aromatic(Element::O),
        'p' => Atom::aromatic(Element::P),
        's' => Atom::aromatic(Element::S),
        _ => return None,
    };
    Some((atom, 1))
}

fn take_number(chars: &[char], i: &mut usize) -> Option<u32> {
    let start = *i;
    while *i < chars.len() && chars[*i].is_ascii_digit() {
        *i += 1;
    }
    if start == *i {
        return None;
    }
    chars[start..*i].iter().collect::<String>().parse().ok()
}

/// Element symbol inside brackets. Lowercase symbols are aromatic.
fn bracket_symbol(chars: &[char], i: &mut usize) -> Option<(Element, bool)> {
    let first = *chars.get(*i)?;
    let aromatic = first.is_ascii_lowercase();
    let capital = first.to_ascii_uppercase();

    if let Some(&second) = chars.get(*i + 1) {
        if second.is_ascii_lowercase() {
            let symbol: String = [capital, second].iter().collect();
            if let Some(element) = Element::from_symbol(&symbol) {
                if !aromatic || element.can_be_aromatic() {
                    *i += 2;
                    return Some((element, aromatic));
                }
            }
        }
    }

    let element = Element::from_symbol(&capital.to_string())?;
    if aromatic && !element.can_be_aromatic() {
        return None;
    }
    *i += 1;
    Some((element, aromatic))
}

/// Parse the inside of `[...]`: isotope, symbol, chirality, hydrogens,
/// charge and atom class, in that order.
fn parse_bracket_atom(content: &str) -> Result<Atom, SmilesError> {
    let invalid = || SmilesError::InvalidBracketAtom(content.to_string());
    let chars: Vec<char> = content.chars().collect();
    let mut i = 0;

    let isotope = match take_number(&chars, &mut i) {
        Some(mass) => Some(u16::try_from(mass).map_err(|_| invalid())?),
        None => None,
    };
    let (element, aromatic) = bracket_symbol(&chars, &mut i).ok_or_else(invalid)?;

    // Chirality is accepted and dropped.
    while chars.get(i) == Some(&'@') {
        i += 1;
    }

    let mut hydrogens = 0;
    if chars.get(i) == Some(&'H') {
        i += 1;
        hydrogens = take_number(&chars, &mut i).unwrap_or(1);
    }

    let mut charge: i32 = 0;
    if let Some(&sign @ ('+' | '-')) = chars.get(i) {
        let unit = if sign == '+' { 1 } else { -1 };
        i += 1;
        charge = match take_number(&chars, &mut i) {
            Some(magnitude) => unit * magnitude as i32,
            None => {
                let mut total = unit;
                while chars.get(i) == Some(&sign) {
                    total += unit;
                    i += 1;
                }
                total
            }
        };
    }

    if chars.get(i) == Some(&':') {
        i += 1;
        take_number(&chars, &mut i).ok_or_else(invalid)?;
    }

    if i != chars.len() {
        return Err(invalid());
    }

    Ok(Atom {
        element,
        aromatic,
        charge: i8::try_from(charge).map_err(|_| invalid())?,
        isotope,
        hydrogens: Some(u8::try_from(hydrogens).map_err(|_| invalid())?),
    })
}

/// Ring closure label at `i`, and how many characters it spans.
fn ring_label(chars: &[char], i: usize) -> Result<(u8, usize), SmilesError> {
    if chars[i] != '%' {
        let digit = chars[i]
            .to_digit(10)
            .ok_or(SmilesError::UnexpectedCharacter(chars[i], i))?;
        return Ok((digit as u8, 1));
    }
    match chars.get(i + 1..i + 3) {
        Some([a, b]) if a.is_ascii_digit() && b.is_ascii_digit() => {
            let label = [*a, *b]
                .iter()
                .collect::<String>()
                .parse()
                .map_err(|_| SmilesError::IncompleteRingLabel(i))?;
            Ok((label, 3))
        }
        _ => Err(SmilesError::IncompleteRingLabel(i)),
    }
}

fn parse_smiles_helper(smiles: &str) -> Result<MoleculeGraph, SmilesError> {
    let mut graph = MoleculeGraph::default();
    let mut current_atom: Option<NodeIndex> = None;
    let mut pending_bond: Option<Bond> = None;
    let mut branch_stack: Vec<NodeIndex> = Vec::new();
    // Open ring closures, with the bond symbol written at the opening (if any).
    let mut ring_map: BTreeMap<u8, (NodeIndex, Option<Bond>)> = BTreeMap::new();

    let chars: Vec<char> = smiles.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '(' => {
                let atom = current_atom.ok_or(SmilesError::BranchNoCurrentAtom(i))?;
                if pending_bond.is_some() {
                    return Err(SmilesError::DanglingBond(i));
                }
                branch_stack.push(atom);
                i += 1;
            }
            ')' => {
                if pending_bond.is_some() {
                    return Err(SmilesError::DanglingBond(i));
                }
                current_atom = Some(branch_stack.pop().ok_or(SmilesError::BranchEndNoStart(i))?);
                i += 1;
            }
            '-' | '=' | '#' | ':' | '/' | '\\' => {
                if current_atom.is_none() {
                    return Err(SmilesError::BondWithoutAtom(i));
                }
                if pending_bond.is_some() {
                    return Err(SmilesError::DanglingBond(i));
                }
                // Directional bonds only carry stereo, which is dropped.
                pending_bond = Some(match c {
                    '=' => Bond::Double,
                    '#' => Bond::Triple,
                    ':' => Bond::Aromatic,
                    _ => Bond::Single,
                });
                i += 1;
            }
            '%' | '0'..='9' => {
                let (label, width) = ring_label(&chars, i)?;
                let current = current_atom.ok_or(SmilesError::RingClosureNoCurrentAtom(c, i))?;
                let bond_here = pending_bond.take();
                match ring_map.remove(&label) {
                    Some((opening, bond_there)) => {
                        if opening == current || graph.find_edge(opening, current).is_some() {
                            return Err(SmilesError::InvalidRingClosure(label, i));
                        }
                        let bond = match (bond_there, bond_here) {
                            (Some(a), Some(b)) if a != b => {
                                return Err(SmilesError::ConflictingRingBonds(label))
                            }
                            (Some(bond), _) | (None, Some(bond)) => bond,
                            (None, None) => implicit_bond(&graph, opening, current),
                        };
                        graph.add_edge(opening, current, bond);
                    }
                    None => {
                        ring_map.insert(label, (current, bond_here));
                    }
                }
                i += width;
            }
            '[' => {
                let end = chars[i..]
                    .iter()
                    .position(|&x| x == ']')
                    .map(|offset| i + offset)
                    .ok_or(SmilesError::UnclosedBracket(i))?;
                let content: String = chars[i + 1..end].iter().collect();
                let atom = parse_bracket_atom(&content)?;
                current_atom = Some(add_atom(&mut graph, current_atom, pending_bond.take(), atom));
                i = end + 1;
            }
            '.' => {
                if pending_bond.is_some() {
                    return Err(SmilesError::DanglingBond(i));
                }
                current_atom = None;
                i += 1;
            }
            _ => {
                let (atom, width) =
                    organic_atom(&chars[i..]).ok_or(SmilesError::UnexpectedCharacter(c, i))?;
                current_atom = Some(add_atom(&mut graph, current_atom, pending_bond.take(), atom));
                i += width;
            }
        }
    }

    if pending_bond.is_some() {
        return Err(SmilesError::DanglingBond(chars.len()));
    }
    if let Some(&label) = ring_map.keys().next() {
        return Err(SmilesError::UnclosedRing(label));
    }
    if !branch_stack.is_empty() {
        return Err(SmilesError::UnclosedBranch);
    }
    if graph.node_count() == 0 {
        return Err(SmilesError::Empty);
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::visit::EdgeRef;

    fn helper_error(smiles: &str) -> SmilesError {
        parse_smiles_helper(smiles).unwrap_err()
    }

    #[test]
    fn test_parse_ethanol() {
        let molecule = parse_smiles("CCO").expect("Failed to parse SMILES");
        assert_eq!(molecule.node_count(), 3);
        assert_eq!(molecule[NodeIndex::new(0)].element, Element::C);
        assert_eq!(molecule[NodeIndex::new(1)].element, Element::C);
        assert_eq!(molecule[NodeIndex::new(2)].element, Element::O);

        let edges: Vec<_> = molecule.edge_references().collect();
        assert_eq!(edges.len(), 2);
        for edge in edges {
            assert_eq!(edge.weight(), &Bond::Single);
        }
    }

    #[test]
    fn test_parse_cyclohexane() {
        let molecule = parse_smiles("C1CCCCC1").expect("Failed to parse SMILES");
        assert_eq!(molecule.edge_count(), 6);
        for node in molecule.node_indices() {
            let degree = molecule.edges(node).count();
            assert_eq!(degree, 2, "Node {} has degree {}", node.index(), degree);
            assert!(!molecule[node].aromatic);
        }
    }

    #[test]
    fn test_parse_kekule_benzene() {
        let molecule = parse_smiles("C1=CC=CC=C1").expect("Failed to parse SMILES");
        assert!(molecule.node_weights().all(|atom| atom.aromatic));
        assert!(molecule.edge_weights().all(|bond| *bond == Bond::Aromatic));
    }

    #[test]
    fn test_parse_two_letter_elements() {
        let molecule = parse_smiles("ClCCBr").unwrap();
        let elements: Vec<Element> = molecule.node_weights().map(|a| a.element).collect();
        assert_eq!(elements, vec![Element::Cl, Element::C, Element::C, Element::Br]);
    }

    #[test]
    fn test_ring_bond_at_either_end() {
        for smiles in ["C=1CCCCC1", "C1CCCCC=1", "C=1CCCCC=1"] {
            let molecule = parse_smiles(smiles).unwrap();
            let doubles = molecule
                .edge_weights()
                .filter(|bond| **bond == Bond::Double)
                .count();
            assert_eq!(doubles, 1, "{smiles}");
        }
        assert_eq!(
            helper_error("C=1CCCCC#1"),
            SmilesError::ConflictingRingBonds(1)
        );
    }

    #[test]
    fn test_two_digit_ring_labels() {
        let molecule = parse_smiles("C%10CCC%10").unwrap();
        assert_eq!(molecule.edge_count(), 4);
        assert_eq!(helper_error("C%1CC"), SmilesError::IncompleteRingLabel(1));
    }

    #[test]
    fn test_bracket_atoms() {
        let ammonium = parse_smiles("[NH4+]").unwrap();
        let atom = ammonium[NodeIndex::new(0)];
        assert_eq!(atom.element, Element::N);
        assert_eq!(atom.charge, 1);
        assert_eq!(atom.hydrogens, Some(4));

        let labelled = parse_smiles("[13CH4]").unwrap();
        assert_eq!(labelled[NodeIndex::new(0)].isotope, Some(13));

        let acetate = parse_smiles("CC(=O)[O-]").unwrap();
        assert_eq!(acetate[NodeIndex::new(3)].charge, -1);

        let dication = parse_smiles("[Ca++]").unwrap();
        assert_eq!(dication[NodeIndex::new(0)].charge, 2);

        let selenophene = parse_smiles("c1cc[se]c1").unwrap();
        assert!(selenophene[NodeIndex::new(3)].aromatic);
        assert_eq!(selenophene[NodeIndex::new(3)].element, Element::Se);
    }

    #[test]
    fn test_stereo_is_ignored() {
        let alanine = parse_smiles("N[C@@H](C)C(=O)O").unwrap();
        assert_eq!(alanine.node_count(), 6);
        assert_eq!(alanine[NodeIndex::new(1)].hydrogens, Some(1));

        let difluoroethene = parse_smiles("F/C=C/F").unwrap();
        assert_eq!(difluoroethene.edge_count(), 3);
    }

    #[test]
    fn test_disconnected_fragments() {
        let salt = Molecule::from_smiles("CC(=O)[O-].[Na+]").unwrap();
        assert_eq!(salt.fragments().len(), 2);
    }

    #[test]
    fn test_malformed_smiles() {
        assert_eq!(helper_error(""), SmilesError::Empty);
        assert_eq!(helper_error("C1CC"), SmilesError::UnclosedRing(1));
        assert_eq!(helper_error("C(C"), SmilesError::UnclosedBranch);
        assert_eq!(helper_error("C)C"), SmilesError::BranchEndNoStart(1));
        assert_eq!(helper_error("(C)"), SmilesError::BranchNoCurrentAtom(0));
        assert_eq!(helper_error("CC="), SmilesError::DanglingBond(3));
        assert_eq!(helper_error("=CC"), SmilesError::BondWithoutAtom(0));
        assert_eq!(helper_error("C[CH3"), SmilesError::UnclosedBracket(1));
        assert_eq!(helper_error("C11"), SmilesError::InvalidRingClosure(1, 2));
        assert_eq!(helper_error("CXC"), SmilesError::UnexpectedCharacter('X', 1));
        assert_eq!(
            helper_error("C[Xe]"),
            SmilesError::InvalidBracketAtom("Xe".to_string())
        );
        assert!(parse_smiles("CC(").is_err());
    }

    #[test]
    fn test_lowercase_atoms_must_be_aromatic() {
        for smiles in ["c1cccc1", "c1ccccccc1", "cC", "C1CCcc1"] {
            let err = parse_smiles(smiles).unwrap_err();
            assert!(
                err.chain()
                    .any(|cause| matches!(cause.downcast_ref::<SmilesError>(), Some(SmilesError::NotAromatic(_)))),
                "{smiles}: {err:#}"
            );
        }
        assert!(parse_smiles("c1cc[nH]c1").is_ok());
        assert!(parse_smiles("c1ccc2ccccc2c1").is_ok());
    }

    #[test]
    fn test_parse_base_compounds() {
        let aspirin = Molecule::from_smiles("CC(=O)OC1=CC=CC=C1C(=O)O").unwrap();
        assert_eq!(aspirin.atom_count(), 13);
        assert_eq!(aspirin.formula(), "C9H8O4");

        let penicillin =
            Molecule::from_smiles("CC1(C)SC2C(NC(=O)CC3=CC=CC=C3)C(=O)N2C1C(=O)O").unwrap();
        assert_eq!(penicillin.atom_count(), 23);
        assert_eq!(penicillin.formula(), "C16H18N2O4S");

        let ibuprofen = Molecule::from_smiles("CC(C)CC1=CC=C(C=C1)C(C)C(=O)O").unwrap();
        assert_eq!(ibuprofen.atom_count(), 15);
        assert_eq!(ibuprofen.formula(), "C13H18O2");
    }
}
