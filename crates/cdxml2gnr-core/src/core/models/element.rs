use phf::{Map, phf_map};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

struct ElementData {
    symbol: &'static str,
    /// Covalent radius in Angstroms (Cordero et al., Dalton Trans. 2008).
    covalent_radius: f64,
    /// Most common neutral valence, used to derive implicit hydrogens.
    default_valence: Option<u8>,
}

const fn data(symbol: &'static str, covalent_radius: f64, default_valence: Option<u8>) -> ElementData {
    ElementData {
        symbol,
        covalent_radius,
        default_valence,
    }
}

static ELEMENTS: [ElementData; 86] = [
    data("H", 0.31, Some(1)),
    data("He", 0.28, None),
    data("Li", 1.28, None),
    data("Be", 0.96, None),
    data("B", 0.84, Some(3)),
    data("C", 0.76, Some(4)),
    data("N", 0.71, Some(3)),
    data("O", 0.66, Some(2)),
    data("F", 0.57, Some(1)),
    data("Ne", 0.58, None),
    data("Na", 1.66, None),
    data("Mg", 1.41, None),
    data("Al", 1.21, None),
    data("Si", 1.11, Some(4)),
    data("P", 1.07, Some(3)),
    data("S", 1.05, Some(2)),
    data("Cl", 1.02, Some(1)),
    data("Ar", 1.06, None),
    data("K", 2.03, None),
    data("Ca", 1.76, None),
    data("Sc", 1.70, None),
    data("Ti", 1.60, None),
    data("V", 1.53, None),
    data("Cr", 1.39, None),
    data("Mn", 1.39, None),
    data("Fe", 1.32, None),
    data("Co", 1.26, None),
    data("Ni", 1.24, None),
    data("Cu", 1.32, None),
    data("Zn", 1.22, None),
    data("Ga", 1.22, None),
    data("Ge", 1.20, Some(4)),
    data("As", 1.19, Some(3)),
    data("Se", 1.20, Some(2)),
    data("Br", 1.20, Some(1)),
    data("Kr", 1.16, None),
    data("Rb", 2.20, None),
    data("Sr", 1.95, None),
    data("Y", 1.90, None),
    data("Zr", 1.75, None),
    data("Nb", 1.64, None),
    data("Mo", 1.54, None),
    data("Tc", 1.47, None),
    data("Ru", 1.46, None),
    data("Rh", 1.42, None),
    data("Pd", 1.39, None),
    data("Ag", 1.45, None),
    data("Cd", 1.44, None),
    data("In", 1.42, None),
    data("Sn", 1.39, None),
    data("Sb", 1.39, None),
    data("Te", 1.38, Some(2)),
    data("I", 1.39, Some(1)),
    data("Xe", 1.40, None),
    data("Cs", 2.44, None),
    data("Ba", 2.15, None),
    data("La", 2.07, None),
    data("Ce", 2.04, None),
    data("Pr", 2.03, None),
    data("Nd", 2.01, None),
    data("Pm", 1.99, None),
    data("Sm", 1.98, None),
    data("Eu", 1.98, None),
    data("Gd", 1.96, None),
    data("Tb", 1.94, None),
    data("Dy", 1.92, None),
    data("Ho", 1.92, None),
    data("Er", 1.89, None),
    data("Tm", 1.90, None),
    data("Yb", 1.87, None),
    data("Lu", 1.87, None),
    data("Hf", 1.75, None),
    data("Ta", 1.70, None),
    data("W", 1.62, None),
    data("Re", 1.51, None),
    data("Os", 1.44, None),
    data("Ir", 1.41, None),
    data("Pt", 1.36, None),
    data("Au", 1.36, None),
    data("Hg", 1.32, None),
    data("Tl", 1.45, None),
    data("Pb", 1.46, None),
    data("Bi", 1.48, None),
    data("Po", 1.40, None),
    data("At", 1.50, None),
    data("Rn", 1.50, None),
];

static SYMBOL_TO_NUMBER: Map<&'static str, u8> = phf_map! {
    "H" => 1, "He" => 2, "Li" => 3, "Be" => 4, "B" => 5, "C" => 6, "N" => 7, "O" => 8,
    "F" => 9, "Ne" => 10, "Na" => 11, "Mg" => 12, "Al" => 13, "Si" => 14, "P" => 15,
    "S" => 16, "Cl" => 17, "Ar" => 18, "K" => 19, "Ca" => 20, "Sc" => 21, "Ti" => 22,
    "V" => 23, "Cr" => 24, "Mn" => 25, "Fe" => 26, "Co" => 27, "Ni" => 28, "Cu" => 29,
    "Zn" => 30, "Ga" => 31, "Ge" => 32, "As" => 33, "Se" => 34, "Br" => 35, "Kr" => 36,
    "Rb" => 37, "Sr" => 38, "Y" => 39, "Zr" => 40, "Nb" => 41, "Mo" => 42, "Tc" => 43,
    "Ru" => 44, "Rh" => 45, "Pd" => 46, "Ag" => 47, "Cd" => 48, "In" => 49, "Sn" => 50,
    "Sb" => 51, "Te" => 52, "I" => 53, "Xe" => 54, "Cs" => 55, "Ba" => 56, "La" => 57,
    "Ce" => 58, "Pr" => 59, "Nd" => 60, "Pm" => 61, "Sm" => 62, "Eu" => 63, "Gd" => 64,
    "Tb" => 65, "Dy" => 66, "Ho" => 67, "Er" => 68, "Tm" => 69, "Yb" => 70, "Lu" => 71,
    "Hf" => 72, "Ta" => 73, "W" => 74, "Re" => 75, "Os" => 76, "Ir" => 77, "Pt" => 78,
    "Au" => 79, "Hg" => 80, "Tl" => 81, "Pb" => 82, "Bi" => 83, "Po" => 84, "At" => 85,
    "Rn" => 86,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ElementError {
    #[error("Unsupported atomic number: {0}")]
    UnknownAtomicNumber(u32),
    #[error("Unknown element symbol: '{0}'")]
    UnknownSymbol(String),
}

/// A chemical element, identified by its atomic number.
///
/// Only elements up to radon (Z = 86) are supported, which covers everything a
/// chemical sketch of an organic or organometallic fragment is expected to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Element(u8);

impl Element {
    pub const HYDROGEN: Element = Element(1);
    pub const CARBON: Element = Element(6);
    pub const NITROGEN: Element = Element(7);
    pub const OXYGEN: Element = Element(8);

    /// Looks up an element by atomic number.
    ///
    /// # Errors
    ///
    /// Returns [`ElementError::UnknownAtomicNumber`] for zero or numbers beyond radon.
    pub fn from_atomic_number(number: u32) -> Result<Self, ElementError> {
        if (1..=ELEMENTS.len() as u32).contains(&number) {
            Ok(Element(number as u8))
        } else {
            Err(ElementError::UnknownAtomicNumber(number))
        }
    }

    pub fn atomic_number(self) -> u8 {
        self.0
    }

    pub fn symbol(self) -> &'static str {
        self.data().symbol
    }

    /// Covalent radius in Angstroms, used as the bonding proximity threshold.
    pub fn covalent_radius(self) -> f64 {
        self.data().covalent_radius
    }

    pub fn default_valence(self) -> Option<u8> {
        self.data().default_valence
    }

    /// Valence adjusted for a formal charge.
    ///
    /// Pnictogens and chalcogens gain a bond per positive charge (NH4+, H3O+);
    /// every other element loses one bond per unit of charge of either sign
    /// (carbocations, carbanions, BH4-).
    pub fn charged_valence(self, charge: i32) -> Option<u8> {
        let base = i32::from(self.default_valence()?);
        let adjusted = match self.symbol() {
            "N" | "P" | "As" | "O" | "S" | "Se" | "Te" => base + charge,
            _ => base - charge.abs(),
        };
        Some(adjusted.clamp(0, u8::MAX as i32) as u8)
    }

    pub fn is_hydrogen(self) -> bool {
        self == Self::HYDROGEN
    }

    fn data(self) -> &'static ElementData {
        &ELEMENTS[usize::from(self.0) - 1]
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Element {
    type Err = ElementError;

    /// Parses an element symbol. Matching is case-insensitive on the first letter
    /// only as a convenience for all-caps formats; "CL" and "cl" both resolve to chlorine.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let normalized: String = match chars.next() {
            Some(first) => first
                .to_uppercase()
                .chain(chars.flat_map(char::to_lowercase))
                .collect(),
            None => String::new(),
        };
        SYMBOL_TO_NUMBER
            .get(normalized.as_str())
            .map(|&n| Element(n))
            .ok_or_else(|| ElementError::UnknownSymbol(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_table_and_number_table_agree() {
        for (index, entry) in ELEMENTS.iter().enumerate() {
            let number = SYMBOL_TO_NUMBER[entry.symbol];
            assert_eq!(usize::from(number), index + 1, "mismatch for {}", entry.symbol);
        }
        assert_eq!(SYMBOL_TO_NUMBER.len(), ELEMENTS.len());
    }

    #[test]
    fn from_atomic_number_accepts_supported_range() {
        assert_eq!(Element::from_atomic_number(6).unwrap(), Element::CARBON);
        assert_eq!(Element::from_atomic_number(86).unwrap().symbol(), "Rn");
        assert_eq!(
            Element::from_atomic_number(0),
            Err(ElementError::UnknownAtomicNumber(0))
        );
        assert_eq!(
            Element::from_atomic_number(87),
            Err(ElementError::UnknownAtomicNumber(87))
        );
    }

    #[test]
    fn from_str_normalizes_case() {
        assert_eq!("C".parse::<Element>().unwrap(), Element::CARBON);
        assert_eq!("CL".parse::<Element>().unwrap().symbol(), "Cl");
        assert_eq!("br".parse::<Element>().unwrap().symbol(), "Br");
        assert!(matches!(
            "Xx".parse::<Element>(),
            Err(ElementError::UnknownSymbol(_))
        ));
        assert!("".parse::<Element>().is_err());
    }

    #[test]
    fn carbon_properties_match_reference_values() {
        assert_eq!(Element::CARBON.covalent_radius(), 0.76);
        assert_eq!(Element::HYDROGEN.covalent_radius(), 0.31);
        assert_eq!(Element::CARBON.default_valence(), Some(4));
        assert_eq!(Element::CARBON.to_string(), "C");
    }

    #[test]
    fn charged_valence_follows_group_conventions() {
        assert_eq!(Element::NITROGEN.charged_valence(1), Some(4));
        assert_eq!(Element::OXYGEN.charged_valence(-1), Some(1));
        assert_eq!(Element::CARBON.charged_valence(1), Some(3));
        assert_eq!(Element::CARBON.charged_valence(-1), Some(3));
        assert_eq!(Element::from_atomic_number(26).unwrap().charged_valence(2), None);
    }
}
