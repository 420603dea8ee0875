//! Substructure search of SMARTS patterns by backtracking subgraph
//! isomorphism, and replacement of matched substructures.

use std::collections::HashSet;

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use tracing::{debug, trace};

use crate::*;

/// What an atom query may ask about a target atom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtomFacts {
    pub element: Element,
    pub aromatic: bool,
    pub charge: i8,
    /// Carried hydrogens plus hydrogen neighbours.
    pub total_hydrogens: u8,
    /// Explicit graph neighbours.
    pub degree: u8,
    /// Graph neighbours plus carried hydrogens.
    pub connectivity: u8,
    /// Number of SSSR rings the atom is in.
    pub ring_count: u8,
}

/// A molecule prepared for repeated pattern searches.
pub struct MatchTarget<'a> {
    graph: &'a MoleculeGraph,
    facts: Vec<AtomFacts>,
    rings: RingInfo,
}

impl<'a> MatchTarget<'a> {
    pub fn new(molecule: &'a Molecule) -> Self {
        let graph = molecule.graph();
        let rings = RingInfo::new(graph);
        let facts = graph
            .node_indices()
            .map(|node| {
                let atom = graph[node];
                let degree = molecule.degree(node) as u8;
                let carried = molecule.hydrogen_count(node);
                AtomFacts {
                    element: atom.element,
                    aromatic: atom.aromatic,
                    charge: atom.charge,
                    total_hydrogens: molecule.total_hydrogens(node),
                    degree,
                    connectivity: degree + carried,
                    ring_count: rings.atom_ring_count(node),
                }
            })
            .collect();
        Self {
            graph,
            facts,
            rings,
        }
    }

    pub fn facts(&self, node: NodeIndex) -> &AtomFacts {
        &self.facts[node.index()]
    }

    /// All matches, each mapping pattern atom `i` to `match[i]`. Matches are
    /// found with pattern atoms in order and target atoms in ascending
    /// index. With `uniquify`, matches covering the same atom set as an
    /// earlier one are dropped.
    pub fn find_matches(
        &self,
        pattern: &Pattern,
        uniquify: bool,
        max_matches: Option<usize>,
    ) -> Vec<Vec<NodeIndex>> {
        let mut search = Search::new(self, pattern, None, max_matches, uniquify);
        search.run();
        search.matches
    }

    /// Whether the pattern matches with its first atom on `root`.
    pub fn matches_at(&self, pattern: &Pattern, root: NodeIndex) -> bool {
        let mut search = Search::new(self, pattern, Some(root), Some(1), false);
        search.run();
        !search.matches.is_empty()
    }
}

struct Search<'s, 'a> {
    target: &'s MatchTarget<'a>,
    pattern: &'s PatternGraph,
    root: Option<NodeIndex>,
    max_matches: Option<usize>,
    uniquify: bool,
    core_pattern: Vec<Option<NodeIndex>>,
    core_target: Vec<bool>,
    seen_sets: HashSet<Vec<NodeIndex>>,
    matches: Vec<Vec<NodeIndex>>,
}

impl<'s, 'a> Search<'s, 'a> {
    fn new(
        target: &'s MatchTarget<'a>,
        pattern: &'s Pattern,
        root: Option<NodeIndex>,
        max_matches: Option<usize>,
        uniquify: bool,
    ) -> Self {
        Self {
            target,
            pattern: pattern.graph(),
            root,
            max_matches,
            uniquify,
            core_pattern: vec![None; pattern.atom_count()],
            core_target: vec![false; target.graph.node_count()],
            seen_sets: HashSet::new(),
            matches: Vec::new(),
        }
    }

    fn done(&self) -> bool {
        self.max_matches
            .is_some_and(|max| self.matches.len() >= max)
    }

    fn run(&mut self) {
        if self.pattern.node_count() == 0 || self.pattern.node_count() > self.target.graph.node_count()
        {
            return;
        }
        self.extend(0);
    }

    fn extend(&mut self, depth: usize) {
        if self.done() {
            return;
        }
        if depth == self.pattern.node_count() {
            let mapping: Vec<NodeIndex> = self.core_pattern.iter().flatten().copied().collect();
            if self.uniquify {
                let mut key = mapping.clone();
                key.sort();
                if !self.seen_sets.insert(key) {
                    return;
                }
            }
            self.matches.push(mapping);
            return;
        }

        let pattern_atom = NodeIndex::new(depth);
        for candidate in self.candidates(pattern_atom) {
            if self.is_feasible(pattern_atom, candidate) {
                self.core_pattern[depth] = Some(candidate);
                self.core_target[candidate.index()] = true;
                self.extend(depth + 1);
                self.core_pattern[depth] = None;
                self.core_target[candidate.index()] = false;
                if self.done() {
                    return;
                }
            }
        }
    }

    /// Unmapped target atoms adjacent to every mapped neighbour of the
    /// pattern atom, or every unmapped atom if it has none.
    fn candidates(&self, pattern_atom: NodeIndex) -> Vec<NodeIndex> {
        if pattern_atom.index() == 0 {
            if let Some(root) = self.root {
                return vec![root];
            }
        }

        let graph = self.target.graph;
        let mut candidates: Option<Vec<NodeIndex>> = None;
        for p_neighbor in self.pattern.neighbors(pattern_atom) {
            if let Some(t_mapped) = self.core_pattern[p_neighbor.index()] {
                let t_neighbors: Vec<NodeIndex> = graph
                    .neighbors(t_mapped)
                    .filter(|n| !self.core_target[n.index()])
                    .collect();
                candidates = Some(match candidates {
                    None => t_neighbors,
                    Some(existing) => existing
                        .into_iter()
                        .filter(|n| t_neighbors.contains(n))
                        .collect(),
                });
            }
        }

        let mut candidates = candidates.unwrap_or_else(|| {
            graph
                .node_indices()
                .filter(|n| !self.core_target[n.index()])
                .collect()
        });
        candidates.sort();
        candidates.dedup();
        candidates
    }

    fn is_feasible(&self, pattern_atom: NodeIndex, target_atom: NodeIndex) -> bool {
        if self.core_target[target_atom.index()] {
            return false;
        }
        if !self.pattern[pattern_atom].matches(self.target.facts(target_atom)) {
            return false;
        }

        let graph = self.target.graph;
        for edge in self.pattern.edges(pattern_atom) {
            let Some(t_mapped) = self.core_pattern[edge.target().index()] else {
                continue;
            };
            match graph.find_edge(target_atom, t_mapped) {
                Some(t_edge) => {
                    let in_ring = self.target.rings.is_ring_bond(t_edge);
                    if !edge.weight().matches(graph[t_edge], in_ring) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }
}

/// Every unique match of `pattern` in `molecule`.
pub fn find_matches(molecule: &Molecule, pattern: &Pattern) -> Vec<Vec<NodeIndex>> {
    MatchTarget::new(molecule).find_matches(pattern, true, None)
}

pub fn has_match(molecule: &Molecule, pattern: &Pattern) -> bool {
    !MatchTarget::new(molecule)
        .find_matches(pattern, false, Some(1))
        .is_empty()
}

/// Replace the matched atoms with a copy of `replacement`.
///
/// The replacement's first atom takes over every bond from the match's
/// first atom to atoms outside the match. Bonds from the other matched
/// atoms are dropped with them, so the product may fall apart into
/// fragments.
fn replace_matches(
    molecule: &Molecule,
    matches: &[Vec<NodeIndex>],
    replacement: &Molecule,
) -> Molecule {
    let mut product = molecule.clone();
    let mut removed: HashSet<NodeIndex> = HashSet::new();

    for matched in matches {
        let mapping = product.insert(replacement);
        let (Some(&anchor), Some(&first)) = (mapping.get(&NodeIndex::new(0)), matched.first())
        else {
            continue;
        };
        for edge in molecule.graph().edges(first) {
            let neighbor = edge.target();
            if matched.contains(&neighbor) {
                continue;
            }
            let mut bond = *edge.weight();
            let graph = product.graph_mut();
            if bond == Bond::Aromatic && !(graph[anchor].aromatic && graph[neighbor].aromatic) {
                bond = Bond::Single;
            }
            trace!("Reconnecting {:?} to {:?} with {:?}", anchor, neighbor, bond);
            graph.add_edge(anchor, neighbor, bond);
        }
        removed.extend(matched.iter().copied());
    }

    product.without_atoms(&removed)
}

/// Replace substructures matching `query` with `replacement`.
///
/// With `replace_all` false there is one product per unique match, each
/// replacing only that match. With `replace_all` true there is a single
/// product with every match replaced. No match gives no products.
pub fn replace_substructs(
    molecule: &Molecule,
    query: &Pattern,
    replacement: &Molecule,
    replace_all: bool,
) -> Vec<Molecule> {
    let matches = find_matches(molecule, query);
    debug!(
        "Pattern {:?} matched {} time(s) in {:?}",
        query,
        matches.len(),
        molecule
    );
    if matches.is_empty() {
        return Vec::new();
    }
    if replace_all {
        vec![replace_matches(molecule, &matches, replacement)]
    } else {
        matches
            .iter()
            .map(|matched| replace_matches(molecule, std::slice::from_ref(matched), replacement))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mol(smiles: &str) -> Molecule {
        Molecule::from_smiles(smiles).unwrap_or_else(|e| panic!("bad SMILES {smiles:?}: {e}"))
    }

    fn pattern(smarts: &str) -> Pattern {
        Pattern::parse(smarts).unwrap_or_else(|e| panic!("bad SMARTS {smarts:?}: {e}"))
    }

    fn indices(match_: &[NodeIndex]) -> Vec<usize> {
        match_.iter().map(|n| n.index()).collect()
    }

    const ASPIRIN: &str = "CC(=O)OC1=CC=CC=C1C(=O)O";

    #[test]
    fn benzene_in_phenol() {
        assert!(has_match(&mol("Oc1ccccc1"), &pattern("c1ccccc1")));
    }

    #[test]
    fn no_match_benzene_in_cyclohexane() {
        assert!(!has_match(&mol("C1CCCCC1"), &pattern("c1ccccc1")));
    }

    #[test]
    fn carboxyl_matches_in_aspirin_are_ordered() {
        let matches = find_matches(&mol(ASPIRIN), &pattern("C(=O)O"));
        assert_eq!(matches.len(), 2);
        assert_eq!(indices(&matches[0]), vec![1, 2, 3]);
        assert_eq!(indices(&matches[1]), vec![10, 11, 12]);
    }

    #[test]
    fn uniquify_drops_symmetric_matches() {
        let propane = mol("CCC");
        let target = MatchTarget::new(&propane);
        let query = pattern("CCC");
        assert_eq!(target.find_matches(&query, false, None).len(), 2);
        assert_eq!(target.find_matches(&query, true, None).len(), 1);
    }

    #[test]
    fn hydrogen_and_connectivity_primitives() {
        let ibuprofen = mol("CC(C)CC1=CC=C(C=C1)C(C)C(=O)O");
        assert_eq!(find_matches(&ibuprofen, &pattern("[CH3]")).len(), 3);
        assert_eq!(find_matches(&ibuprofen, &pattern("[cH]")).len(), 4);
        assert_eq!(find_matches(&ibuprofen, &pattern("[CX4]")).len(), 6);
        assert_eq!(find_matches(&ibuprofen, &pattern("[OH]")).len(), 1);
        assert_eq!(find_matches(&ibuprofen, &pattern("[D3]")).len(), 5);
    }

    #[test]
    fn ring_primitives() {
        let toluene = mol("Cc1ccccc1");
        assert_eq!(find_matches(&toluene, &pattern("[R]")).len(), 6);
        assert_eq!(find_matches(&toluene, &pattern("[R0]")).len(), 1);
        assert_eq!(find_matches(&toluene, &pattern("C@c")).len(), 0);
        assert_eq!(find_matches(&toluene, &pattern("c@c")).len(), 6);
    }

    #[test]
    fn rooted_matching() {
        let ethanol = mol("CCO");
        let target = MatchTarget::new(&ethanol);
        let query = pattern("[CH2]O");
        assert!(!target.matches_at(&query, NodeIndex::new(0)));
        assert!(target.matches_at(&query, NodeIndex::new(1)));
    }

    #[test]
    fn explicit_hydrogens_are_matched() {
        let methanol = mol("CO").with_explicit_hydrogens();
        let target = MatchTarget::new(&methanol);
        assert_eq!(target.find_matches(&pattern("[#1]O"), true, None).len(), 1);
        assert_eq!(target.find_matches(&pattern("[#1][#6]"), true, None).len(), 3);
        assert_eq!(target.facts(NodeIndex::new(0)).total_hydrogens, 3);
        assert_eq!(target.facts(NodeIndex::new(0)).connectivity, 4);
    }

    #[test]
    fn one_product_per_match() {
        let products = replace_substructs(
            &mol(ASPIRIN),
            &pattern("C(=O)O"),
            &mol("CC(=O)O"),
            false,
        );
        assert_eq!(products.len(), 2);
        // The ester carbon is replaced and the ring loses its acetoxy group.
        assert_eq!(products[0].to_smiles(), "CCC(=O)O.O=C(O)c1ccccc1");
        assert_eq!(products[0].formula(), "C10H12O4");
        assert_eq!(products[0].fragments().len(), 2);
    }

    #[test]
    fn replace_all_gives_single_product() {
        let products = replace_substructs(
            &mol(ASPIRIN),
            &pattern("C(=O)O"),
            &mol("CC(=O)O"),
            true,
        );
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].formula(), "C11H14O4");
    }

    #[test]
    fn no_match_returns_empty() {
        let products = replace_substructs(
            &mol("CC(C)C"),
            &pattern("C(=O)O"),
            &mol("CC(=O)O"),
            false,
        );
        assert!(products.is_empty());
    }

    #[test]
    fn substituent_preservation() {
        // Chlorine swapped for bromine keeps the rest of the molecule whole.
        let products = replace_substructs(&mol("CCCl"), &pattern("Cl"), &mol("Br"), false);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].to_smiles(), "CCBr");
    }
}
