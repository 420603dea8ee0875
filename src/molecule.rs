use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::{Debug, Formatter, Result as FmtResult};

use anyhow::Result;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

use crate::*;

/// A molecule: a graph of atoms joined by bonds, with hydrogens usually left
/// implicit.
#[derive(Clone, Default)]
pub struct Molecule(MoleculeGraph);

impl Molecule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_graph(graph: MoleculeGraph) -> Self {
        Molecule(graph)
    }

    /// Parse a SMILES string, perceiving aromaticity on the result.
    pub fn from_smiles(smiles: &str) -> Result<Self> {
        parse_smiles(smiles).map(Molecule)
    }

    /// Canonical SMILES for this molecule.
    pub fn to_smiles(&self) -> String {
        molecule_to_smiles(&self.0)
    }

    pub fn graph(&self) -> &MoleculeGraph {
        &self.0
    }

    pub fn graph_mut(&mut self) -> &mut MoleculeGraph {
        &mut self.0
    }

    pub fn into_graph(self) -> MoleculeGraph {
        self.0
    }

    pub fn atom_count(&self) -> usize {
        self.0.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.0.edge_count()
    }

    pub fn heavy_atom_count(&self) -> usize {
        self.0
            .node_weights()
            .filter(|atom| !atom.is_hydrogen())
            .count()
    }

    /// Number of explicit graph neighbours.
    pub fn degree(&self, node: NodeIndex) -> usize {
        self.0.edges(node).count()
    }

    pub fn bonded_valence(&self, node: NodeIndex) -> u8 {
        bonded_valence(&self.0, node)
    }

    pub fn implicit_hydrogens(&self, node: NodeIndex) -> u8 {
        implicit_hydrogens(&self.0, node)
    }

    pub fn hydrogen_count(&self, node: NodeIndex) -> u8 {
        hydrogen_count(&self.0, node)
    }

    /// All hydrogens on the atom, carried or attached as graph nodes.
    pub fn total_hydrogens(&self, node: NodeIndex) -> u8 {
        let attached = self
            .0
            .neighbors(node)
            .filter(|&n| self.0[n].is_hydrogen())
            .count() as u8;
        self.hydrogen_count(node) + attached
    }

    /// Copy of the molecule with every carried hydrogen turned into a graph
    /// node. Heavy atoms keep a fixed hydrogen count of zero afterwards.
    pub fn with_explicit_hydrogens(&self) -> Molecule {
        let mut graph = self.0.clone();
        for node in self.0.node_indices() {
            let count = self.hydrogen_count(node);
            graph[node].hydrogens = Some(0);
            for _ in 0..count {
                let mut hydrogen = Atom::new(Element::H);
                hydrogen.hydrogens = Some(0);
                let h = graph.add_node(hydrogen);
                graph.add_edge(node, h, Bond::Single);
            }
        }
        Molecule(graph)
    }

    /// Append a copy of `other`. Returns where each of its atoms landed.
    pub fn insert(&mut self, other: &Molecule) -> BTreeMap<NodeIndex, NodeIndex> {
        let mut mapping = BTreeMap::new();
        for node in other.0.node_indices() {
            let new_node = self.0.add_node(other.0[node]);
            mapping.insert(node, new_node);
        }
        for edge in other.0.edge_references() {
            let src = mapping[&edge.source()];
            let tgt = mapping[&edge.target()];
            self.0.add_edge(src, tgt, *edge.weight());
        }
        mapping
    }

    /// Copy of the molecule without the given atoms. Surviving atoms keep
    /// their relative order.
    pub fn without_atoms(&self, remove: &HashSet<NodeIndex>) -> Molecule {
        let mut graph = MoleculeGraph::default();
        let mut node_map: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        for node in self.0.node_indices() {
            if !remove.contains(&node) {
                node_map.insert(node, graph.add_node(self.0[node]));
            }
        }
        for edge in self.0.edge_references() {
            if let (Some(&src), Some(&tgt)) =
                (node_map.get(&edge.source()), node_map.get(&edge.target()))
            {
                graph.add_edge(src, tgt, *edge.weight());
            }
        }
        Molecule(graph)
    }

    /// Connected components, each as a list of atoms in discovery order.
    pub fn fragments(&self) -> Vec<Vec<NodeIndex>> {
        let mut components: Vec<Vec<NodeIndex>> = Vec::new();
        let mut visited: HashSet<NodeIndex> = HashSet::new();

        for node in self.0.node_indices() {
            if visited.contains(&node) {
                continue;
            }
            let mut stack = vec![node];
            let mut comp = Vec::new();
            while let Some(current) = stack.pop() {
                if visited.insert(current) {
                    comp.push(current);
                    for neighbor in self.0.neighbors(current) {
                        if !visited.contains(&neighbor) {
                            stack.push(neighbor);
                        }
                    }
                }
            }
            components.push(comp);
        }
        components
    }

    /// Molecular formula in Hill order: C, then H, then alphabetical.
    pub fn formula(&self) -> String {
        let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        for node in self.0.node_indices() {
            *counts.entry(self.0[node].element.symbol()).or_insert(0) += 1;
            let h = self.hydrogen_count(node) as usize;
            if h > 0 {
                *counts.entry("H").or_insert(0) += h;
            }
        }

        let mut formula = String::new();
        let mut push = |symbol: &str, count: usize| {
            formula.push_str(symbol);
            if count > 1 {
                formula.push_str(&count.to_string());
            }
        };

        if let Some(c) = counts.remove("C") {
            push("C", c);
            if let Some(h) = counts.remove("H") {
                push("H", h);
            }
        }
        for (symbol, count) in counts {
            push(symbol, count);
        }
        formula
    }

    /// Graph isomorphism over atoms and bonds.
    pub fn is_same_as(&self, other: &Molecule) -> bool {
        petgraph::algo::is_isomorphic_matching(&self.0, &other.0, |a, b| a == b, |a, b| a == b)
    }
}

/// Sum of bond orders around `node`, with aromatic bonds counted as 1.5
/// and the total rounded down.
pub fn bonded_valence(graph: &MoleculeGraph, node: NodeIndex) -> u8 {
    let twice: u32 = graph
        .edges(node)
        .map(|edge| edge.weight().valence_x2() as u32)
        .sum();
    (twice / 2) as u8
}

/// Hydrogens implied by the default valence of an organic-subset atom.
///
/// Aromatic atoms only ever use their lowest valence, so `s` and `n`
/// with a full set of ring bonds get no hydrogen.
pub fn implicit_hydrogens(graph: &MoleculeGraph, node: NodeIndex) -> u8 {
    let atom = &graph[node];
    if atom.charge != 0 {
        return 0;
    }
    let valences = atom.element.default_valences();
    let used = bonded_valence(graph, node);
    if atom.aromatic {
        return valences.first().map_or(0, |v| v.saturating_sub(used));
    }
    valences
        .iter()
        .find(|&&v| v >= used)
        .map_or(0, |v| v - used)
}

/// Hydrogens carried by the atom itself: the fixed count of a bracket atom,
/// or the implied count otherwise. Explicit hydrogen nodes are not included.
pub fn hydrogen_count(graph: &MoleculeGraph, node: NodeIndex) -> u8 {
    match graph[node].hydrogens {
        Some(count) => count,
        None => implicit_hydrogens(graph, node),
    }
}

impl From<MoleculeGraph> for Molecule {
    fn from(graph: MoleculeGraph) -> Self {
        Molecule(graph)
    }
}

impl Debug for Molecule {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.to_smiles())
    }
}
