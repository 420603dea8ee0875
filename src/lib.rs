use tracing::metadata::LevelFilter;

mod element;
pub use element::*;

mod molecule;
pub use molecule::*;

mod parse;
pub use parse::*;

mod rings;
pub use rings::*;

mod aromatic;
pub use aromatic::*;

mod canon;
pub use canon::*;

mod substructure;
pub use substructure::*;

mod crippen;
pub use crippen::*;

mod descriptors;
pub use descriptors::*;

mod bases;
pub use bases::*;

mod derivative;
pub use derivative::*;

/// An atom in a molecule graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Atom {
    pub element: Element,
    pub aromatic: bool,
    pub charge: i8,
    pub isotope: Option<u16>,
    /// Fixed hydrogen count. `None` means hydrogens are implied from the
    /// element's default valence and the current bonds.
    pub hydrogens: Option<u8>,
}

impl Atom {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            aromatic: false,
            charge: 0,
            isotope: None,
            hydrogens: None,
        }
    }

    pub fn aromatic(element: Element) -> Self {
        Self {
            aromatic: true,
            ..Self::new(element)
        }
    }

    pub fn is_hydrogen(&self) -> bool {
        self.element == Element::H
    }

    pub fn is_carbon(&self) -> bool {
        self.element == Element::C
    }
}

impl From<Element> for Atom {
    fn from(element: Element) -> Self {
        Atom::new(element)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bond {
    Single,
    Double,
    Triple,
    Aromatic,
}

impl Bond {
    /// Twice the bond order, so aromatic bonds stay integral.
    pub fn valence_x2(&self) -> u8 {
        match self {
            Bond::Single => 2,
            Bond::Aromatic => 3,
            Bond::Double => 4,
            Bond::Triple => 6,
        }
    }

    pub fn smiles_symbol(&self) -> &'static str {
        match self {
            Bond::Single => "-",
            Bond::Double => "=",
            Bond::Triple => "#",
            Bond::Aromatic => ":",
        }
    }
}

pub type MoleculeGraph = petgraph::graph::UnGraph<Atom, Bond>;

/// Environment variable holding the log level for the binary.
pub const LOG_ENV: &str = "DRUGSIM_LOG";

/// Install a stderr `tracing` subscriber at the given level
/// (`error`, `warn`, `info`, `debug`, `trace`). Unknown levels fall back to
/// `warn`. Calling this more than once is harmless.
pub fn init_logging(level: &str) {
    let level = level.parse::<LevelFilter>().unwrap_or(LevelFilter::WARN);
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
