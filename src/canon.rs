use std::collections::BTreeSet;

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use tracing::trace;

use crate::*;

pub trait MorganCanonize {
    fn morgan_canonize(&self) -> Self;
}

impl MorganCanonize for MoleculeGraph {
    fn morgan_canonize(&self) -> Self {
        let ranks = canonical_ranks(self);
        rebuild_canonical_graph(self, &ranks)
    }
}

/// Graph invariants an atom starts with before refinement. Terminal atoms
/// sort first so they tend to start the written string.
fn atom_invariant(graph: &MoleculeGraph, node: NodeIndex) -> (usize, u8, bool, u8, i8, u16) {
    let atom = graph[node];
    let attached_h = graph
        .neighbors(node)
        .filter(|&n| graph[n].is_hydrogen())
        .count() as u8;
    (
        graph.edges(node).count(),
        atom.element.atomic_number(),
        atom.aromatic,
        hydrogen_count(graph, node) + attached_h,
        atom.charge,
        atom.isotope.unwrap_or(0),
    )
}

/// Replace each key by its position among the distinct sorted keys.
fn dense_rank<K: Ord>(keys: &[K]) -> Vec<usize> {
    let mut sorted: Vec<&K> = keys.iter().collect();
    sorted.sort();
    sorted.dedup();
    keys.iter()
        .map(|key| sorted.binary_search(&key).unwrap_or(0))
        .collect()
}

fn class_count(ranks: &[usize]) -> usize {
    ranks.iter().collect::<BTreeSet<_>>().len()
}

/// Split rank classes by the ranks of neighbours and the bonds to them,
/// until no class splits any further.
fn refine(graph: &MoleculeGraph, mut ranks: Vec<usize>) -> Vec<usize> {
    loop {
        let classes = class_count(&ranks);
        let keys: Vec<(usize, Vec<(usize, Bond)>)> = graph
            .node_indices()
            .map(|node| {
                let mut neighbors: Vec<(usize, Bond)> = graph
                    .edges(node)
                    .map(|edge| (ranks[edge.target().index()], *edge.weight()))
                    .collect();
                neighbors.sort();
                (ranks[node.index()], neighbors)
            })
            .collect();
        let next = dense_rank(&keys);
        if class_count(&next) == classes {
            return next;
        }
        ranks = next;
    }
}

/// A distinct rank for every atom, independent of input atom order up to
/// symmetry.
pub fn canonical_ranks(graph: &MoleculeGraph) -> Vec<usize> {
    let invariants: Vec<_> = graph
        .node_indices()
        .map(|node| atom_invariant(graph, node))
        .collect();
    let mut ranks = refine(graph, dense_rank(&invariants));

    // Break remaining ties by promoting one atom of the lowest tied class.
    while class_count(&ranks) < graph.node_count() {
        let Some(tied) = (0..graph.node_count())
            .find(|&rank| ranks.iter().filter(|&&r| r == rank).count() > 1)
        else {
            break;
        };
        let Some(chosen) = ranks.iter().position(|&r| r == tied) else {
            break;
        };
        let keys: Vec<(usize, bool)> = ranks
            .iter()
            .enumerate()
            .map(|(i, &rank)| (rank, i != chosen))
            .collect();
        ranks = refine(graph, dense_rank(&keys));
    }
    ranks
}

/// Rebuild the graph with atom `i` at the position of its rank. Edges are
/// inserted in sorted order so neighbour iteration is canonical too.
pub fn rebuild_canonical_graph(graph: &MoleculeGraph, ranks: &[usize]) -> MoleculeGraph {
    let mut order: Vec<NodeIndex> = graph.node_indices().collect();
    order.sort_by_key(|node| ranks[node.index()]);

    let mut mapping = vec![NodeIndex::end(); graph.node_count()];
    let mut new_graph = MoleculeGraph::default();
    for old in order {
        mapping[old.index()] = new_graph.add_node(graph[old]);
    }

    let mut edges: Vec<(NodeIndex, NodeIndex, Bond)> = graph
        .edge_references()
        .map(|edge| {
            let a = mapping[edge.source().index()];
            let b = mapping[edge.target().index()];
            (a.min(b), a.max(b), *edge.weight())
        })
        .collect();
    edges.sort();
    for (a, b, bond) in edges {
        new_graph.add_edge(a, b, bond);
    }
    new_graph
}

/// A ring closure edge: opened at the ancestor, closed at the descendant.
#[derive(Debug, Clone)]
struct RingClosure {
    opening: NodeIndex,
    closing: NodeIndex,
    bond: Bond,
    digit: usize,
}

fn format_ring(digit: usize) -> String {
    if digit < 10 {
        digit.to_string()
    } else {
        format!("%{}", digit)
    }
}

fn bond_symbol(graph: &MoleculeGraph, a: NodeIndex, b: NodeIndex, bond: Bond) -> &'static str {
    match bond {
        Bond::Single if graph[a].aromatic && graph[b].aromatic => "-",
        Bond::Single => "",
        Bond::Aromatic if graph[a].aromatic && graph[b].aromatic => "",
        other => other.smiles_symbol(),
    }
}

fn atom_symbol(graph: &MoleculeGraph, node: NodeIndex) -> String {
    let atom = graph[node];
    let symbol = if atom.aromatic {
        atom.element.aromatic_symbol()
    } else {
        atom.element.symbol().to_string()
    };
    let hydrogens = hydrogen_count(graph, node);

    let writable_bare = atom.element.is_organic_subset()
        && (!atom.aromatic || atom.element.symbol().len() == 1)
        && atom.charge == 0
        && atom.isotope.is_none()
        && hydrogens == implicit_hydrogens(graph, node);
    if writable_bare {
        return symbol;
    }

    let mut s = String::from("[");
    if let Some(isotope) = atom.isotope {
        s.push_str(&isotope.to_string());
    }
    s.push_str(&symbol);
    match hydrogens {
        0 => {}
        1 => s.push('H'),
        n => s.push_str(&format!("H{n}")),
    }
    match atom.charge {
        0 => {}
        1 => s.push('+'),
        -1 => s.push('-'),
        c if c > 0 => s.push_str(&format!("+{c}")),
        c => s.push_str(&format!("-{}", -(c as i16))),
    }
    s.push(']');
    s
}

/// First pass: depth-first spanning tree, recording every back edge as a
/// ring closure.
fn spanning_tree(
    graph: &MoleculeGraph,
    current: NodeIndex,
    parent: Option<NodeIndex>,
    visited: &mut [bool],
    children: &mut [Vec<NodeIndex>],
    closures: &mut Vec<RingClosure>,
) {
    visited[current.index()] = true;
    let mut neighbors: Vec<NodeIndex> = graph.neighbors(current).collect();
    neighbors.sort();
    for neighbor in neighbors {
        if Some(neighbor) == parent {
            continue;
        }
        if !visited[neighbor.index()] {
            children[current.index()].push(neighbor);
            spanning_tree(graph, neighbor, Some(current), visited, children, closures);
        } else if !closures
            .iter()
            .any(|rc| rc.opening == current && rc.closing == neighbor)
        {
            // First seen from the descendant, so `neighbor` is the ancestor.
            if let Some(edge) = graph.find_edge(current, neighbor) {
                closures.push(RingClosure {
                    opening: neighbor,
                    closing: current,
                    bond: graph[edge],
                    digit: 0,
                });
            }
        }
    }
}

/// Whether the subtree under `node` closes a ring opened above it.
fn closes_above(children: &[Vec<NodeIndex>], closures: &[RingClosure], node: NodeIndex) -> bool {
    let mut subtree = BTreeSet::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        subtree.insert(current);
        stack.extend(children[current.index()].iter().copied());
    }
    closures
        .iter()
        .any(|rc| subtree.contains(&rc.closing) && !subtree.contains(&rc.opening))
}

struct SmilesWriter<'a> {
    graph: &'a MoleculeGraph,
    children: Vec<Vec<NodeIndex>>,
    closures: Vec<RingClosure>,
    digits_in_use: BTreeSet<usize>,
    out: String,
}

impl SmilesWriter<'_> {
    fn write_atom(&mut self, current: NodeIndex) {
        let graph = self.graph;
        self.out.push_str(&atom_symbol(graph, current));

        let closing: Vec<usize> = self
            .closures
            .iter()
            .enumerate()
            .filter(|(_, rc)| rc.closing == current)
            .map(|(i, _)| i)
            .collect();
        let mut opening: Vec<usize> = self
            .closures
            .iter()
            .enumerate()
            .filter(|(_, rc)| rc.opening == current)
            .map(|(i, _)| i)
            .collect();
        opening.sort_by_key(|&i| self.closures[i].closing);

        // New digits are taken before this atom's closings free theirs, so a
        // digit is never closed and reopened on the same atom.
        for &i in &opening {
            let digit = (1..)
                .find(|d| !self.digits_in_use.contains(d))
                .unwrap_or(1);
            self.digits_in_use.insert(digit);
            self.closures[i].digit = digit;
        }
        for &i in &closing {
            let digit = self.closures[i].digit;
            self.out.push_str(&format_ring(digit));
            self.digits_in_use.remove(&digit);
        }
        for &i in &opening {
            let rc = &self.closures[i];
            self.out
                .push_str(bond_symbol(graph, rc.opening, rc.closing, rc.bond));
            self.out.push_str(&format_ring(rc.digit));
        }

        let children = self.children[current.index()].clone();
        let last = children.len().saturating_sub(1);
        for (i, child) in children.into_iter().enumerate() {
            let bond = graph
                .find_edge(current, child)
                .map(|edge| graph[edge])
                .unwrap_or(Bond::Single);
            if i < last {
                self.out.push('(');
            }
            self.out.push_str(bond_symbol(graph, current, child, bond));
            self.write_atom(child);
            if i < last {
                self.out.push(')');
            }
        }
    }
}

/// Canonical SMILES for a molecule graph. Disconnected fragments are joined
/// with `.`, in order of their lowest-ranked atom.
pub fn molecule_to_smiles(graph: &MoleculeGraph) -> String {
    let graph = graph.morgan_canonize();
    let n = graph.node_count();

    let mut visited = vec![false; n];
    let mut children = vec![Vec::new(); n];
    let mut closures = Vec::new();
    let mut roots = Vec::new();
    for node in graph.node_indices() {
        if !visited[node.index()] {
            roots.push(node);
            spanning_tree(&graph, node, None, &mut visited, &mut children, &mut closures);
        }
    }

    // Branches that finish a ring go last, so the ring closes on the main
    // path and substituents sit in parentheses.
    let tree = children.clone();
    for list in children.iter_mut() {
        list.sort_by_key(|&child| closes_above(&tree, &closures, child));
    }

    let mut writer = SmilesWriter {
        graph: &graph,
        children,
        closures,
        digits_in_use: BTreeSet::new(),
        out: String::new(),
    };
    for (i, root) in roots.into_iter().enumerate() {
        if i > 0 {
            writer.out.push('.');
        }
        writer.write_atom(root);
    }
    trace!("Wrote canonical SMILES {}", writer.out);
    writer.out
}
