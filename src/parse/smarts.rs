//! A SMARTS subset: enough of the query language to express substructure
//! replacement patterns and atom-typing tables.

use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::str::FromStr;

use anyhow::{Context, Result};
use nom::{
    branch::alt,
    character::complete::{char, digit1, one_of},
    combinator::{all_consuming, map, map_res, opt, value},
    error::{convert_error, ErrorKind, ParseError, VerboseError},
    multi::{many0, many0_count, separated_list1},
    sequence::preceded,
    IResult,
};
use petgraph::graph::{NodeIndex, UnGraph};
use thiserror::Error;

use crate::*;

pub type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

#[derive(Error, Debug, PartialEq)]
pub enum SmartsError {
    #[error("Empty SMARTS pattern")]
    Empty,
    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),
    #[error("Unclosed bracket '[' at position {0}")]
    UnclosedBracket(usize),
    #[error("Invalid atom expression [{0}]: {1}")]
    InvalidAtom(String, String),
    #[error("Branch start '(' at position {0} without a current atom")]
    BranchNoCurrentAtom(usize),
    #[error("Branch end ')' at position {0} without a matching '('")]
    BranchEndNoStart(usize),
    #[error("Branch opened but never closed")]
    UnclosedBranch,
    #[error("Ring closure {0} is never closed")]
    UnclosedRing(u8),
    #[error("Bond symbol at position {0} is not followed by an atom")]
    DanglingBond(usize),
}

/// A predicate over one atom of a molecule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtomQuery {
    /// An element symbol. `aromatic` is `Some(false)` for `C`, `Some(true)`
    /// for `c`.
    Element {
        element: Element,
        aromatic: Option<bool>,
    },
    /// `#n`: element regardless of aromaticity.
    AtomicNumber(u8),
    /// `a`
    Aromatic,
    /// `A`
    Aliphatic,
    /// `*`
    Any,
    /// `Hn`: total attached hydrogens.
    HydrogenCount(u8),
    /// `Xn`: total connections, hydrogens included.
    Connectivity(u8),
    /// `Dn`: explicit connections.
    Degree(u8),
    Charge(i8),
    /// `R` alone is "in some ring", `Rn` is "in exactly n smallest rings".
    Ring(Option<u8>),
    Not(Box<AtomQuery>),
    And(Vec<AtomQuery>),
    Or(Vec<AtomQuery>),
}

impl AtomQuery {
    fn combine(mut terms: Vec<AtomQuery>, build: fn(Vec<AtomQuery>) -> AtomQuery) -> AtomQuery {
        if terms.len() == 1 {
            terms.remove(0)
        } else {
            build(terms)
        }
    }

    pub fn matches(&self, facts: &AtomFacts) -> bool {
        match self {
            AtomQuery::Element { element, aromatic } => {
                facts.element == *element && aromatic.map_or(true, |a| a == facts.aromatic)
            }
            AtomQuery::AtomicNumber(n) => facts.element.atomic_number() == *n,
            AtomQuery::Aromatic => facts.aromatic,
            AtomQuery::Aliphatic => !facts.aromatic,
            AtomQuery::Any => true,
            AtomQuery::HydrogenCount(n) => facts.total_hydrogens == *n,
            AtomQuery::Connectivity(n) => facts.connectivity == *n,
            AtomQuery::Degree(n) => facts.degree == *n,
            AtomQuery::Charge(c) => facts.charge == *c,
            AtomQuery::Ring(None) => facts.ring_count > 0,
            AtomQuery::Ring(Some(n)) => facts.ring_count == *n,
            AtomQuery::Not(inner) => !inner.matches(facts),
            AtomQuery::And(terms) => terms.iter().all(|t| t.matches(facts)),
            AtomQuery::Or(terms) => terms.iter().any(|t| t.matches(facts)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondQuery {
    /// No bond symbol: single or aromatic.
    Unspecified,
    Single,
    Double,
    Triple,
    Aromatic,
    /// `~`
    Any,
    /// `@`
    Ring,
}

impl BondQuery {
    pub fn matches(&self, bond: Bond, in_ring: bool) -> bool {
        match self {
            BondQuery::Unspecified => matches!(bond, Bond::Single | Bond::Aromatic),
            BondQuery::Single => bond == Bond::Single,
            BondQuery::Double => bond == Bond::Double,
            BondQuery::Triple => bond == Bond::Triple,
            BondQuery::Aromatic => bond == Bond::Aromatic,
            BondQuery::Any => true,
            BondQuery::Ring => in_ring,
        }
    }
}

pub type PatternGraph = UnGraph<AtomQuery, BondQuery>;

/// A parsed SMARTS pattern. Pattern atoms keep the order they were written
/// in, so atom 0 is the first atom of the string.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    graph: PatternGraph,
}

impl Pattern {
    pub fn parse(smarts: &str) -> Result<Self> {
        let graph = parse_smarts_helper(smarts)
            .context(format!("Failed to parse SMARTS pattern {smarts}"))?;
        Ok(Self {
            source: smarts.to_string(),
            graph,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn graph(&self) -> &PatternGraph {
        &self.graph
    }

    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }
}

impl FromStr for Pattern {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pattern::parse(s)
    }
}

impl Debug for Pattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.source)
    }
}

// ---------------------------------------------------------------------
// Bracket atom expressions
// ---------------------------------------------------------------------

fn small_number(input: &str) -> Res<'_, u8> {
    map_res(digit1, |digits: &str| digits.parse::<u8>())(input)
}

fn atomic_number(input: &str) -> Res<'_, AtomQuery> {
    map(preceded(char('#'), small_number), AtomQuery::AtomicNumber)(input)
}

/// `+`, `++`, `+2`, `-0` and so on.
fn charge(input: &str) -> Res<'_, AtomQuery> {
    let (input, sign) = one_of("+-")(input)?;
    let unit: i8 = if sign == '+' { 1 } else { -1 };
    if let Ok((rest, magnitude)) = small_number(input) {
        return Ok((rest, AtomQuery::Charge(unit * magnitude as i8)));
    }
    let (input, repeats) = many0_count(char(sign))(input)?;
    Ok((input, AtomQuery::Charge(unit * (repeats as i8 + 1))))
}

fn counted<'a>(
    symbol: char,
    build: fn(u8) -> AtomQuery,
) -> impl FnMut(&'a str) -> Res<'a, AtomQuery> {
    map(preceded(char(symbol), opt(small_number)), move |n| {
        build(n.unwrap_or(1))
    })
}

fn ring(input: &str) -> Res<'_, AtomQuery> {
    map(preceded(char('R'), opt(small_number)), AtomQuery::Ring)(input)
}

fn bracket_element(input: &str) -> Res<'_, AtomQuery> {
    for element in Element::BY_SYMBOL_LENGTH {
        if element == Element::H {
            continue;
        }
        if let Some(rest) = input.strip_prefix(element.symbol()) {
            return Ok((
                rest,
                AtomQuery::Element {
                    element,
                    aromatic: Some(false),
                },
            ));
        }
        if element.can_be_aromatic() {
            if let Some(rest) = input.strip_prefix(element.aromatic_symbol().as_str()) {
                return Ok((
                    rest,
                    AtomQuery::Element {
                        element,
                        aromatic: Some(true),
                    },
                ));
            }
        }
    }
    Err(nom::Err::Error(VerboseError::from_error_kind(
        input,
        ErrorKind::Alpha,
    )))
}

fn primitive(input: &str) -> Res<'_, AtomQuery> {
    alt((
        atomic_number,
        charge,
        value(AtomQuery::Any, char('*')),
        counted('H', AtomQuery::HydrogenCount),
        counted('X', AtomQuery::Connectivity),
        counted('D', AtomQuery::Degree),
        ring,
        bracket_element,
        value(AtomQuery::Aromatic, char('a')),
        value(AtomQuery::Aliphatic, char('A')),
    ))(input)
}

fn negation(input: &str) -> Res<'_, AtomQuery> {
    alt((
        map(preceded(char('!'), negation), |q| AtomQuery::Not(Box::new(q))),
        primitive,
    ))(input)
}

/// `&` binds tightest and may be left out: `NH2` is `N&H2`.
fn high_and(input: &str) -> Res<'_, AtomQuery> {
    let (input, first) = negation(input)?;
    let (input, mut rest) = many0(preceded(opt(char('&')), negation))(input)?;
    rest.insert(0, first);
    Ok((input, AtomQuery::combine(rest, AtomQuery::And)))
}

fn disjunction(input: &str) -> Res<'_, AtomQuery> {
    map(separated_list1(char(','), high_and), |terms| {
        AtomQuery::combine(terms, AtomQuery::Or)
    })(input)
}

fn low_and(input: &str) -> Res<'_, AtomQuery> {
    map(separated_list1(char(';'), disjunction), |terms| {
        AtomQuery::combine(terms, AtomQuery::And)
    })(input)
}

/// Parse the contents of a bracket atom, e.g. `NH2+0` or `A;!#1`.
pub fn parse_atom_expression(content: &str) -> Result<AtomQuery, SmartsError> {
    if content.is_empty() {
        return Err(SmartsError::InvalidAtom(
            content.to_string(),
            "empty atom expression".to_string(),
        ));
    }
    all_consuming(low_and)(content)
        .map(|(_, query)| query)
        .map_err(|e| {
            let message = match e {
                nom::Err::Error(e) | nom::Err::Failure(e) => convert_error(content, e),
                nom::Err::Incomplete(_) => "incomplete input".to_string(),
            };
            SmartsError::InvalidAtom(content.to_string(), message)
        })
}

// ---------------------------------------------------------------------
// Pattern structure
// ---------------------------------------------------------------------

fn organic_query(chars: &[char]) -> Option<(AtomQuery, usize)> {
    let aliphatic = |element| AtomQuery::Element {
        element,
        aromatic: Some(false),
    };
    let aromatic = |element| AtomQuery::Element {
        element,
        aromatic: Some(true),
    };
    match chars {
        ['C', 'l', ..] => return Some((aliphatic(Element::Cl), 2)),
        ['B', 'r', ..] => return Some((aliphatic(Element::Br), 2)),
        _ => {}
    }
    let query = match chars.first()? {
        'B' => aliphatic(Element::B),
        'C' => aliphatic(Element::C),
        'N' => aliphatic(Element::N),
        'O' => aliphatic(Element::O),
        'P' => aliphatic(Element::P),
        'S' => aliphatic(Element::S),
        'F' => aliphatic(Element::F),
        'I' => aliphatic(Element::I),
        'b' => aromatic(Element::B),
        'c' => aromatic(Element::C),
        'n' => aromatic(Element::N),
        'o' => aromatic(Element::O),
        'p' => aromatic(Element::P),
        's' => aromatic(Element::S),
        '*' => AtomQuery::Any,
        'a' => AtomQuery::Aromatic,
        'A' => AtomQuery::Aliphatic,
        _ => return None,
    };
    Some((query, 1))
}

fn add_atom(
    graph: &mut PatternGraph,
    current: &mut Option<NodeIndex>,
    bond: Option<BondQuery>,
    query: AtomQuery,
) {
    let node = graph.add_node(query);
    if let Some(prev) = *current {
        graph.add_edge(prev, node, bond.unwrap_or(BondQuery::Unspecified));
    }
    *current = Some(node);
}

fn parse_smarts_helper(smarts: &str) -> Result<PatternGraph, SmartsError> {
    let mut graph = PatternGraph::default();
    let mut current_atom: Option<NodeIndex> = None;
    let mut pending_bond: Option<BondQuery> = None;
    let mut branch_stack: Vec<NodeIndex> = Vec::new();
    let mut ring_map: BTreeMap<u8, (NodeIndex, Option<BondQuery>)> = BTreeMap::new();

    let chars: Vec<char> = smarts.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '(' => {
                let atom = current_atom.ok_or(SmartsError::BranchNoCurrentAtom(i))?;
                branch_stack.push(atom);
                i += 1;
            }
            ')' => {
                if pending_bond.is_some() {
                    return Err(SmartsError::DanglingBond(i));
                }
                current_atom = Some(branch_stack.pop().ok_or(SmartsError::BranchEndNoStart(i))?);
                i += 1;
            }
            '-' | '=' | '#' | ':' | '~' | '@' => {
                if current_atom.is_none() || pending_bond.is_some() {
                    return Err(SmartsError::UnexpectedCharacter(c, i));
                }
                pending_bond = Some(match c {
                    '-' => BondQuery::Single,
                    '=' => BondQuery::Double,
                    '#' => BondQuery::Triple,
                    ':' => BondQuery::Aromatic,
                    '~' => BondQuery::Any,
                    _ => BondQuery::Ring,
                });
                i += 1;
            }
            '0'..='9' => {
                let current = current_atom.ok_or(SmartsError::UnexpectedCharacter(c, i))?;
                let label = c as u8 - b'0';
                let bond_here = pending_bond.take();
                match ring_map.remove(&label) {
                    Some((opening, bond_there)) => {
                        let bond = bond_there.or(bond_here).unwrap_or(BondQuery::Unspecified);
                        graph.add_edge(opening, current, bond);
                    }
                    None => {
                        ring_map.insert(label, (current, bond_here));
                    }
                }
                i += 1;
            }
            '[' => {
                let end = chars[i..]
                    .iter()
                    .position(|&x| x == ']')
                    .map(|offset| i + offset)
                    .ok_or(SmartsError::UnclosedBracket(i))?;
                let content: String = chars[i + 1..end].iter().collect();
                let query = parse_atom_expression(&content)?;
                add_atom(&mut graph, &mut current_atom, pending_bond.take(), query);
                i = end + 1;
            }
            _ => {
                let (query, width) =
                    organic_query(&chars[i..]).ok_or(SmartsError::UnexpectedCharacter(c, i))?;
                add_atom(&mut graph, &mut current_atom, pending_bond.take(), query);
                i += width;
            }
        }
    }

    if pending_bond.is_some() {
        return Err(SmartsError::DanglingBond(chars.len()));
    }
    if let Some(&label) = ring_map.keys().next() {
        return Err(SmartsError::UnclosedRing(label));
    }
    if !branch_stack.is_empty() {
        return Err(SmartsError::UnclosedBranch);
    }
    if graph.node_count() == 0 {
        return Err(SmartsError::Empty);
    }
    Ok(graph)
}
