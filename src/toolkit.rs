//! The seam between the filter and whatever turns SMILES into molecules.
//! [Native] reads and writes SMILES with [crate::smiles]; with the `python` feature,
//! [crate::rdkit::Rdkit] goes through RDKit instead.

use std::borrow::Cow;

use crate::smiles::{Molecule, SmilesError};

/// the view of a parsed molecule that the filter and the split writer need
pub trait Structure {
    fn num_atoms(&self) -> usize;

    fn formal_charge(&self, atom: usize) -> i32;

    fn symbol(&self, atom: usize) -> Cow<'_, str>;

    /// serialized form written to the output files
    fn to_smiles(&self) -> String;

    /// the title that followed the SMILES in the input, if any
    fn name(&self) -> Option<&str> {
        None
    }
}

pub trait Toolkit {
    type Mol: Structure;
    type Error: std::error::Error;

    fn parse(&self, smiles: &str) -> Result<Self::Mol, Self::Error>;
}

/// the pure-Rust toolkit
#[derive(Clone, Copy, Debug, Default)]
pub struct Native;

impl Toolkit for Native {
    type Mol = Molecule;
    type Error = SmilesError;

    fn parse(&self, smiles: &str) -> Result<Molecule, SmilesError> {
        Molecule::parse(smiles)
    }
}

impl Structure for Molecule {
    fn num_atoms(&self) -> usize {
        Molecule::num_atoms(self)
    }

    fn formal_charge(&self, atom: usize) -> i32 {
        i32::from(Molecule::formal_charge(self, atom))
    }

    fn symbol(&self, atom: usize) -> Cow<'_, str> {
        Cow::Borrowed(Molecule::symbol(self, atom))
    }

    fn to_smiles(&self) -> String {
        self.smiles().to_owned()
    }

    fn name(&self) -> Option<&str> {
        Molecule::name(self)
    }
}
