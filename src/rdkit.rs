//! RDKit through pyo3, for when the output should match RDKit's own parsing
//! and canonical SMILES exactly.

use std::borrow::Cow;

use pyo3::{prelude::PyAnyMethods, types::PyModule, PyErr, PyResult, Python};
use thiserror::Error;

use crate::toolkit::{Structure, Toolkit};

#[derive(Debug, Error)]
pub enum RdkitError {
    #[error("RDKit could not parse {0}")]
    Rejected(String),

    #[error(transparent)]
    Python(#[from] PyErr),
}

/// the parts of an RDKit molecule we need, copied out while holding the GIL
#[derive(Clone, Debug, PartialEq)]
pub struct RdkitMol {
    symbols: Vec<String>,
    charges: Vec<i32>,
    smiles: String,
    name: Option<String>,
}

impl Structure for RdkitMol {
    fn num_atoms(&self) -> usize {
        self.symbols.len()
    }

    fn formal_charge(&self, atom: usize) -> i32 {
        self.charges[atom]
    }

    fn symbol(&self, atom: usize) -> Cow<'_, str> {
        Cow::Borrowed(&self.symbols[atom])
    }

    fn to_smiles(&self) -> String {
        self.smiles.clone()
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Rdkit {
    _priv: (),
}

impl Rdkit {
    /// check that rdkit is importable and silence its parse warnings, which
    /// would otherwise flood stderr for every rejected row
    pub fn new() -> PyResult<Self> {
        Python::with_gil(|py| {
            PyModule::import_bound(py, "rdkit.Chem")?;
            PyModule::import_bound(py, "rdkit.RDLogger")?
                .call_method1("DisableLog", ("rdApp.*",))?;
            Ok(Self { _priv: () })
        })
    }
}

impl Toolkit for Rdkit {
    type Mol = RdkitMol;
    type Error = RdkitError;

    fn parse(&self, smiles: &str) -> Result<RdkitMol, RdkitError> {
        Python::with_gil(|py| {
            let chem = PyModule::import_bound(py, "rdkit.Chem")?;
            let mol = chem.call_method1("MolFromSmiles", (smiles,))?;
            if mol.is_none() {
                return Err(RdkitError::Rejected(smiles.to_owned()));
            }
            let mut symbols = Vec::new();
            let mut charges = Vec::new();
            for atom in mol.call_method0("GetAtoms")?.iter()? {
                let atom = atom?;
                symbols.push(atom.call_method0("GetSymbol")?.extract()?);
                charges.push(atom.call_method0("GetFormalCharge")?.extract()?);
            }
            let name = if mol.call_method1("HasProp", ("_Name",))?.extract()? {
                Some(mol.call_method1("GetProp", ("_Name",))?.extract()?)
            } else {
                None
            };
            let smiles = chem
                .call_method1("MolToSmiles", (mol.clone(),))?
                .extract()?;
            Ok(RdkitMol {
                symbols,
                charges,
                smiles,
                name,
            })
        })
    }
}
