//! Ring perception over the smallest set of smallest rings (SSSR).

use std::collections::VecDeque;

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::*;

/// Ring membership of every atom and bond in a molecule.
#[derive(Debug, Clone, Default)]
pub struct RingInfo {
    rings: Vec<Vec<NodeIndex>>,
    atom_rings: Vec<u8>,
    ring_bonds: Vec<bool>,
}

impl RingInfo {
    pub fn new(graph: &MoleculeGraph) -> Self {
        let mut ring_bonds = vec![false; graph.edge_count()];
        let rings = find_sssr_with_bonds(graph, &mut ring_bonds);

        let mut atom_rings = vec![0u8; graph.node_count()];
        for ring in &rings {
            for node in ring {
                atom_rings[node.index()] += 1;
            }
        }

        Self {
            rings,
            atom_rings,
            ring_bonds,
        }
    }

    /// The SSSR, smallest rings first. Each ring lists its atoms in order
    /// around the ring.
    pub fn rings(&self) -> &[Vec<NodeIndex>] {
        &self.rings
    }

    /// How many SSSR rings contain `node`.
    pub fn atom_ring_count(&self, node: NodeIndex) -> u8 {
        self.atom_rings.get(node.index()).copied().unwrap_or(0)
    }

    pub fn is_ring_atom(&self, node: NodeIndex) -> bool {
        self.atom_ring_count(node) > 0
    }

    /// Whether the bond lies on any cycle. This is exact, even for bonds
    /// whose cycles were not kept in the SSSR.
    pub fn is_ring_bond(&self, edge: EdgeIndex) -> bool {
        self.ring_bonds.get(edge.index()).copied().unwrap_or(false)
    }
}

/// The bonds around a ring, in ring order.
pub fn ring_edges(graph: &MoleculeGraph, ring: &[NodeIndex]) -> Vec<EdgeIndex> {
    (0..ring.len())
        .filter_map(|i| graph.find_edge(ring[i], ring[(i + 1) % ring.len()]))
        .collect()
}

/// Find the smallest set of smallest rings.
pub fn find_sssr(graph: &MoleculeGraph) -> Vec<Vec<NodeIndex>> {
    let mut ring_bonds = vec![false; graph.edge_count()];
    find_sssr_with_bonds(graph, &mut ring_bonds)
}

fn find_sssr_with_bonds(graph: &MoleculeGraph, ring_bonds: &mut [bool]) -> Vec<Vec<NodeIndex>> {
    let expected =
        graph.edge_count() as isize - graph.node_count() as isize + count_components(graph) as isize;
    if expected <= 0 {
        return Vec::new();
    }

    // The shortest cycle through each bond is a candidate.
    let mut candidates: Vec<Vec<NodeIndex>> = Vec::new();
    for edge in graph.edge_references() {
        if let Some(mut ring) = shortest_path_avoiding(graph, edge.source(), edge.target(), edge.id()) {
            ring_bonds[edge.id().index()] = true;
            normalize_ring(&mut ring);
            if !candidates.contains(&ring) {
                candidates.push(ring);
            }
        }
    }
    candidates.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

    // Keep candidates whose bond sets are independent over GF(2), smallest
    // first, until the cycle rank is reached.
    let mut basis: Vec<(usize, Vec<bool>)> = Vec::new();
    let mut rings = Vec::new();
    for ring in candidates {
        if rings.len() as isize >= expected {
            break;
        }
        let mut row = vec![false; graph.edge_count()];
        for edge in ring_edges(graph, &ring) {
            row[edge.index()] = true;
        }
        for (pivot, basis_row) in &basis {
            if row[*pivot] {
                for (bit, &b) in row.iter_mut().zip(basis_row) {
                    *bit ^= b;
                }
            }
        }
        if let Some(pivot) = row.iter().position(|&bit| bit) {
            basis.push((pivot, row));
            rings.push(ring);
        }
    }
    rings
}

fn count_components(graph: &MoleculeGraph) -> usize {
    petgraph::algo::connected_components(graph)
}

/// Breadth-first path from `start` to `end` that does not use `excluded`.
fn shortest_path_avoiding(
    graph: &MoleculeGraph,
    start: NodeIndex,
    end: NodeIndex,
    excluded: EdgeIndex,
) -> Option<Vec<NodeIndex>> {
    let mut parent: Vec<Option<NodeIndex>> = vec![None; graph.node_count()];
    let mut visited = vec![false; graph.node_count()];
    let mut queue = VecDeque::new();

    visited[start.index()] = true;
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        if current == end {
            let mut path = vec![end];
            let mut node = end;
            while let Some(p) = parent[node.index()] {
                path.push(p);
                node = p;
            }
            path.reverse();
            return Some(path);
        }

        let mut neighbors: Vec<(NodeIndex, EdgeIndex)> = graph
            .edges(current)
            .map(|e| (e.target(), e.id()))
            .collect();
        neighbors.sort();
        for (neighbor, edge) in neighbors {
            if edge == excluded || visited[neighbor.index()] {
                continue;
            }
            visited[neighbor.index()] = true;
            parent[neighbor.index()] = Some(current);
            queue.push_back(neighbor);
        }
    }
    None
}

/// Rotate a ring to start at its smallest atom, walking towards the smaller
/// of its two neighbours.
fn normalize_ring(ring: &mut Vec<NodeIndex>) {
    let Some(min_pos) = ring
        .iter()
        .enumerate()
        .min_by_key(|&(_, node)| *node)
        .map(|(i, _)| i)
    else {
        return;
    };
    ring.rotate_left(min_pos);
    let n = ring.len();
    if n > 2 && ring[n - 1] < ring[1] {
        ring[1..].reverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rings_of(smiles: &str) -> RingInfo {
        RingInfo::new(&parse_smiles(smiles).unwrap())
    }

    #[test]
    fn benzene_one_ring() {
        let info = rings_of("c1ccccc1");
        assert_eq!(info.rings().len(), 1);
        assert_eq!(info.rings()[0].len(), 6);
    }

    #[test]
    fn naphthalene_two_rings() {
        let info = rings_of("c1ccc2ccccc2c1");
        assert_eq!(info.rings().len(), 2);
        for ring in info.rings() {
            assert_eq!(ring.len(), 6);
        }
        // The two fusion atoms belong to both rings.
        let shared = (0..10)
            .filter(|&i| info.atom_ring_count(NodeIndex::new(i)) == 2)
            .count();
        assert_eq!(shared, 2);
    }

    #[test]
    fn acyclic_no_rings() {
        let info = rings_of("CCCC");
        assert!(info.rings().is_empty());
        assert!(!info.is_ring_atom(NodeIndex::new(0)));
    }

    #[test]
    fn penicillin_fused_bicycle() {
        let graph = parse_smiles("CC1(C)SC2C(NC(=O)CC3=CC=CC=C3)C(=O)N2C1C(=O)O").unwrap();
        let info = RingInfo::new(&graph);
        let mut sizes: Vec<usize> = info.rings().iter().map(|r| r.len()).collect();
        sizes.sort();
        assert_eq!(sizes, vec![4, 5, 6]);
    }

    #[test]
    fn biphenyl_linker_is_not_a_ring_bond() {
        let graph = parse_smiles("c1ccccc1-c1ccccc1").unwrap();
        let info = RingInfo::new(&graph);
        let linker = graph
            .find_edge(NodeIndex::new(5), NodeIndex::new(6))
            .unwrap();
        assert!(!info.is_ring_bond(linker));
        assert_eq!(graph.edge_indices().filter(|&e| info.is_ring_bond(e)).count(), 12);
    }

    #[test]
    fn ring_edges_follow_the_ring() {
        let graph = parse_smiles("C1CCC1").unwrap();
        let rings = find_sssr(&graph);
        assert_eq!(ring_edges(&graph, &rings[0]).len(), 4);
    }
}
