use std::fmt::{Display, Formatter, Result as FmtResult};

/// The elements the parser understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Element {
    H,
    Li,
    B,
    C,
    N,
    O,
    F,
    Na,
    Mg,
    Si,
    P,
    S,
    Cl,
    K,
    Ca,
    Se,
    Br,
    I,
}

impl Element {
    /// Every supported element, two-letter symbols first so prefix matching
    /// never splits `Cl` into `C` + `l`.
    pub const BY_SYMBOL_LENGTH: [Element; 18] = [
        Element::Li,
        Element::Na,
        Element::Mg,
        Element::Si,
        Element::Cl,
        Element::Ca,
        Element::Se,
        Element::Br,
        Element::H,
        Element::B,
        Element::C,
        Element::N,
        Element::O,
        Element::F,
        Element::P,
        Element::S,
        Element::K,
        Element::I,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Element::H => "H",
            Element::Li => "Li",
            Element::B => "B",
            Element::C => "C",
            Element::N => "N",
            Element::O => "O",
            Element::F => "F",
            Element::Na => "Na",
            Element::Mg => "Mg",
            Element::Si => "Si",
            Element::P => "P",
            Element::S => "S",
            Element::Cl => "Cl",
            Element::K => "K",
            Element::Ca => "Ca",
            Element::Se => "Se",
            Element::Br => "Br",
            Element::I => "I",
        }
    }

    pub fn atomic_number(&self) -> u8 {
        match self {
            Element::H => 1,
            Element::Li => 3,
            Element::B => 5,
            Element::C => 6,
            Element::N => 7,
            Element::O => 8,
            Element::F => 9,
            Element::Na => 11,
            Element::Mg => 12,
            Element::Si => 14,
            Element::P => 15,
            Element::S => 16,
            Element::Cl => 17,
            Element::K => 19,
            Element::Ca => 20,
            Element::Se => 34,
            Element::Br => 35,
            Element::I => 53,
        }
    }

    /// Standard atomic weight, in the same convention the descriptor
    /// tables were fitted with.
    pub fn atomic_weight(&self) -> f64 {
        match self {
            Element::H => 1.008,
            Element::Li => 6.941,
            Element::B => 10.812,
            Element::C => 12.011,
            Element::N => 14.007,
            Element::O => 15.999,
            Element::F => 18.998,
            Element::Na => 22.990,
            Element::Mg => 24.305,
            Element::Si => 28.086,
            Element::P => 30.974,
            Element::S => 32.067,
            Element::Cl => 35.453,
            Element::K => 39.098,
            Element::Ca => 40.078,
            Element::Se => 78.971,
            Element::Br => 79.904,
            Element::I => 126.904,
        }
    }

    /// Exact mass of one isotope, for the isotopes that show up in labelled
    /// structures. `None` for any other mass number.
    pub fn isotope_mass(&self, mass_number: u16) -> Option<f64> {
        let mass = match (self, mass_number) {
            (Element::H, 1) => 1.007825,
            (Element::H, 2) => 2.014102,
            (Element::H, 3) => 3.016049,
            (Element::C, 12) => 12.0,
            (Element::C, 13) => 13.003355,
            (Element::C, 14) => 14.003242,
            (Element::N, 14) => 14.003074,
            (Element::N, 15) => 15.000109,
            (Element::O, 16) => 15.994915,
            (Element::O, 17) => 16.999132,
            (Element::O, 18) => 17.999160,
            (Element::F, 18) => 18.000938,
            (Element::F, 19) => 18.998403,
            (Element::P, 31) => 30.973762,
            (Element::P, 32) => 31.973908,
            (Element::S, 32) => 31.972071,
            (Element::S, 33) => 32.971459,
            (Element::S, 34) => 33.967867,
            (Element::S, 35) => 34.969032,
            (Element::Cl, 35) => 34.968853,
            (Element::Cl, 37) => 36.965903,
            (Element::Br, 79) => 78.918338,
            (Element::Br, 81) => 80.916291,
            (Element::I, 123) => 122.905589,
            (Element::I, 125) => 124.904630,
            (Element::I, 127) => 126.904473,
            (Element::I, 131) => 130.906126,
            _ => return None,
        };
        Some(mass)
    }

    /// Allowed valences for atoms written without brackets. An empty slice
    /// means the element is not in the SMILES organic subset.
    pub fn default_valences(&self) -> &'static [u8] {
        match self {
            Element::B => &[3],
            Element::C => &[4],
            Element::N => &[3, 5],
            Element::O => &[2],
            Element::P => &[3, 5],
            Element::S => &[2, 4, 6],
            Element::F | Element::Cl | Element::Br | Element::I => &[1],
            _ => &[],
        }
    }

    pub fn is_organic_subset(&self) -> bool {
        !self.default_valences().is_empty()
    }

    /// Whether the element may be written in lowercase aromatic form.
    pub fn can_be_aromatic(&self) -> bool {
        matches!(
            self,
            Element::B | Element::C | Element::N | Element::O | Element::P | Element::S | Element::Se
        )
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::BY_SYMBOL_LENGTH
            .iter()
            .copied()
            .find(|element| element.symbol() == symbol)
    }

    pub fn from_atomic_number(number: u8) -> Option<Self> {
        Self::BY_SYMBOL_LENGTH
            .iter()
            .copied()
            .find(|element| element.atomic_number() == number)
    }

    /// Lowercase form used for aromatic atoms (`c`, `n`, `se`).
    pub fn aromatic_symbol(&self) -> String {
        self.symbol().to_lowercase()
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_round_trip() {
        for element in Element::BY_SYMBOL_LENGTH {
            assert_eq!(Element::from_symbol(element.symbol()), Some(element));
            assert_eq!(
                Element::from_atomic_number(element.atomic_number()),
                Some(element)
            );
        }
        assert_eq!(Element::from_symbol("Xx"), None);
    }

    #[test]
    fn two_letter_symbols_come_first() {
        let first_single = Element::BY_SYMBOL_LENGTH
            .iter()
            .position(|e| e.symbol().len() == 1)
            .unwrap();
        assert!(Element::BY_SYMBOL_LENGTH[first_single..]
            .iter()
            .all(|e| e.symbol().len() == 1));
    }

    #[test]
    fn organic_subset() {
        assert!(Element::C.is_organic_subset());
        assert!(Element::Cl.is_organic_subset());
        assert!(!Element::Na.is_organic_subset());
        assert_eq!(Element::S.default_valences(), &[2, 4, 6]);
    }

    #[test]
    fn isotope_masses() {
        assert_eq!(Element::C.isotope_mass(12), Some(12.0));
        assert_eq!(Element::H.isotope_mass(2), Some(2.014102));
        assert_eq!(Element::C.isotope_mass(99), None);
        assert_eq!(Element::Na.isotope_mass(23), None);
    }
}
