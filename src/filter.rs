//! The accept/reject decision for a single structure string.

use serde::{Deserialize, Serialize};

use crate::toolkit::{Structure, Toolkit};

/// Thresholds for [MoleculeFilter]. The defaults select macrocycles and
/// cages: between 100 and 220 heavy atoms (both exclusive), charges of at
/// most one unit, and only C, N, O, P plus the metals Fe, Co, Ni and Zn.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// atom counts must be strictly greater than this
    pub min_atoms: usize,
    /// atom counts must be strictly less than this
    pub max_atoms: usize,
    pub charges: Vec<i32>,
    pub elements: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_atoms: 100,
            max_atoms: 220,
            charges: vec![-1, 0, 1],
            elements: ["C", "N", "O", "P", "Fe", "Co", "Ni", "Zn"]
                .map(String::from)
                .to_vec(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// the row had no structure, or the toolkit could not parse it
    Unparsable,
    AtomCount(usize),
    Charge { atom: usize, charge: i32 },
    Element { atom: usize, symbol: String },
}

impl Rejection {
    /// short label for tallying rejections
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::Unparsable => "unparsable",
            Rejection::AtomCount(_) => "atom count",
            Rejection::Charge { .. } => "formal charge",
            Rejection::Element { .. } => "element",
        }
    }
}

pub struct MoleculeFilter<T> {
    toolkit: T,
    config: FilterConfig,
}

impl<T: Toolkit> MoleculeFilter<T> {
    pub fn new(toolkit: T, config: FilterConfig) -> Self {
        Self { toolkit, config }
    }

    /// check an already parsed molecule, stopping at the first offending atom
    pub fn check<S: Structure>(&self, mol: &S) -> Result<(), Rejection> {
        let n = mol.num_atoms();
        if n <= self.config.min_atoms || n >= self.config.max_atoms {
            return Err(Rejection::AtomCount(n));
        }
        for atom in 0..n {
            let charge = mol.formal_charge(atom);
            if !self.config.charges.contains(&charge) {
                return Err(Rejection::Charge { atom, charge });
            }
            let symbol = mol.symbol(atom);
            if !self.config.elements.iter().any(|e| *e == symbol) {
                return Err(Rejection::Element {
                    atom,
                    symbol: symbol.into_owned(),
                });
            }
        }
        Ok(())
    }

    /// parse and check `smiles`, handing back the molecule if it passes. A
    /// missing structure and every kind of parse failure are rejected the
    /// same way
    pub fn screen(&self, smiles: Option<&str>) -> Result<T::Mol, Rejection> {
        let mol = smiles
            .and_then(|s| self.toolkit.parse(s).ok())
            .ok_or(Rejection::Unparsable)?;
        self.check(&mol)?;
        Ok(mol)
    }

    pub fn accepts(&self, smiles: &str) -> bool {
        self.screen(Some(smiles)).is_ok()
    }
}
