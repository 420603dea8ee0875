//! Hückel aromaticity perception over the SSSR.

use std::collections::BTreeSet;

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use tracing::trace;

use crate::*;

/// Electrons an atom donates to a ring's pi system, or `None` if the atom
/// cannot take part in an aromatic ring.
fn pi_electrons(graph: &MoleculeGraph, info: &RingInfo, node: NodeIndex) -> Option<u8> {
    let atom = graph[node];
    if !atom.element.can_be_aromatic() {
        return None;
    }

    let mut ring_double = false;
    let mut exocyclic_double: Option<Element> = None;
    for edge in graph.edges(node) {
        match *edge.weight() {
            Bond::Double if info.is_ring_bond(edge.id()) => ring_double = true,
            Bond::Double => exocyclic_double = Some(graph[edge.target()].element),
            Bond::Triple => return None,
            _ => {}
        }
    }
    let connections = graph.edges(node).count() + hydrogen_count(graph, node) as usize;

    if atom.aromatic && !ring_double && exocyclic_double.is_none() {
        // Already lowercase: count what the atom would give in a Kekulé form.
        return match atom.element {
            Element::C if atom.charge == -1 => Some(2),
            Element::C => Some(1),
            Element::N | Element::P if atom.charge == 1 => Some(1),
            Element::N | Element::P if connections == 3 => Some(2),
            Element::N | Element::P => Some(1),
            Element::O | Element::S | Element::Se => Some(2),
            Element::B => Some(0),
            _ => None,
        };
    }

    match atom.element {
        Element::C => match (ring_double, exocyclic_double, atom.charge) {
            (true, _, _) => Some(1),
            (false, Some(Element::C), _) => Some(1),
            (false, Some(_), _) => Some(0),
            (false, None, -1) => Some(2),
            (false, None, 1) => Some(0),
            _ => None,
        },
        Element::N | Element::P => {
            if ring_double {
                Some(1)
            } else if atom.charge == 0 && connections == 3 && exocyclic_double.is_none() {
                Some(2)
            } else {
                None
            }
        }
        Element::O | Element::S | Element::Se => {
            if ring_double {
                Some(1)
            } else if atom.charge == 0 && connections == 2 {
                Some(2)
            } else {
                None
            }
        }
        Element::B => (!ring_double && atom.charge == 0).then_some(0),
        _ => None,
    }
}

fn is_huckel(graph: &MoleculeGraph, info: &RingInfo, atoms: &BTreeSet<NodeIndex>) -> bool {
    let mut total = 0u32;
    for &node in atoms {
        match pi_electrons(graph, info, node) {
            Some(electrons) => total += electrons as u32,
            None => return false,
        }
    }
    total % 4 == 2
}

/// Mark aromatic rings: their atoms become aromatic and their bonds
/// `Bond::Aromatic`. Single rings are tried first, then pairs of fused
/// rings together (azulene-like systems). Aromatic bonds left outside any
/// ring are demoted to single bonds.
///
/// Returns the atoms of every aromatic ring. Atoms that were already
/// flagged aromatic but are not in the set were never part of a 4n+2 ring.
pub fn perceive_aromaticity(graph: &mut MoleculeGraph) -> BTreeSet<NodeIndex> {
    let info = RingInfo::new(graph);
    let rings = info.rings().to_vec();

    let mut aromatic_rings: Vec<usize> = Vec::new();
    for (i, ring) in rings.iter().enumerate() {
        let atoms: BTreeSet<NodeIndex> = ring.iter().copied().collect();
        if is_huckel(graph, &info, &atoms) {
            aromatic_rings.push(i);
        }
    }

    let mut fused_systems: Vec<(usize, usize)> = Vec::new();
    for i in 0..rings.len() {
        for j in i + 1..rings.len() {
            if aromatic_rings.contains(&i) && aromatic_rings.contains(&j) {
                continue;
            }
            let a: BTreeSet<NodeIndex> = rings[i].iter().copied().collect();
            let b: BTreeSet<NodeIndex> = rings[j].iter().copied().collect();
            if a.intersection(&b).count() != 2 {
                continue;
            }
            let union: BTreeSet<NodeIndex> = a.union(&b).copied().collect();
            if is_huckel(graph, &info, &union) {
                fused_systems.push((i, j));
            }
        }
    }
    for (i, j) in fused_systems {
        for k in [i, j] {
            if !aromatic_rings.contains(&k) {
                aromatic_rings.push(k);
            }
        }
    }

    // Hydrogen counts before the bonds change, so atoms whose implied count
    // would shift (pyrrole nitrogen) keep what was written.
    let before: Vec<u8> = graph
        .node_indices()
        .map(|node| hydrogen_count(graph, node))
        .collect();

    let mut aromatic_atoms: BTreeSet<NodeIndex> = BTreeSet::new();
    let mut aromatic_edges: BTreeSet<EdgeIndex> = BTreeSet::new();
    for &i in &aromatic_rings {
        trace!("Ring {:?} is aromatic", rings[i]);
        for &node in &rings[i] {
            graph[node].aromatic = true;
            aromatic_atoms.insert(node);
        }
        aromatic_edges.extend(ring_edges(graph, &rings[i]));
    }
    for &edge in &aromatic_edges {
        graph[edge] = Bond::Aromatic;
    }

    for edge in graph.edge_indices().collect::<Vec<_>>() {
        if graph[edge] == Bond::Aromatic && !info.is_ring_bond(edge) {
            graph[edge] = Bond::Single;
        }
    }

    for node in graph.node_indices().collect::<Vec<_>>() {
        if graph[node].hydrogens.is_none() && hydrogen_count(graph, node) != before[node.index()] {
            graph[node].hydrogens = Some(before[node.index()]);
        }
    }
    aromatic_atoms
}
