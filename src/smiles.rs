//! SMILES reading and writing on top of [yowl].
//!
//! A string is read into yowl's adjacency list, explicit hydrogens are folded
//! into their heavy neighbours, and the result is checked for basic chemical
//! sanity the way RDKit's `MolFromSmiles` would. What survives is walked back
//! out into a string right away, so a [Molecule] carries its own output
//! SMILES.

use std::{
    panic::{self, UnwindSafe},
    str::FromStr,
};

use log::debug;
use thiserror::Error;
use yowl::{
    feature::{AtomKind, Symbol},
    graph::{self, Atom, Builder},
    read::{read, ReadError},
    walk::{self, walk},
    write::Writer,
};

mod kekule;
mod sanitize;

#[derive(Debug, Error, PartialEq)]
pub enum SmilesError {
    #[error("empty SMILES string")]
    Empty,

    #[error("invalid SMILES: {0}")]
    Read(#[from] ReadError),

    #[error("invalid ring closure: {0}")]
    Graph(#[from] graph::Error),

    #[error("could not write SMILES: {0}")]
    Walk(#[from] walk::Error),

    /// yowl panics on a few malformed inputs, e.g. conflicting `/` and `\`
    /// bonds on one atom or stereo classes it cannot invert
    #[error("SMILES reader gave up on {0:?}")]
    Aborted(String),

    #[error("non-ring atom {0} marked aromatic")]
    NonRingAromatic(usize),

    #[error("can't kekulize the aromatic system containing atom {0}")]
    Kekulize(usize),

    #[error("explicit valence of {valence} on atom {atom} ({symbol}) is greater than the allowed {max}")]
    Valence {
        atom: usize,
        symbol: &'static str,
        valence: u32,
        max: u8,
    },
}

fn symbol(kind: &AtomKind) -> &'static str {
    let symbol = match kind {
        AtomKind::Symbol(symbol) => symbol,
        AtomKind::Bracket { symbol, .. } => symbol,
    };
    match symbol {
        Symbol::Star => "*",
        Symbol::Aliphatic(element) | Symbol::Aromatic(element) => element.symbol(),
    }
}

fn charge(kind: &AtomKind) -> i8 {
    match kind {
        AtomKind::Bracket {
            charge: Some(charge),
            ..
        } => i8::from(*charge),
        _ => 0,
    }
}

/// run one of yowl's steps, turning a panic into an error for `smiles`
fn guarded<T>(
    smiles: &str,
    step: impl FnOnce() -> Result<T, SmilesError> + UnwindSafe,
) -> Result<T, SmilesError> {
    panic::catch_unwind(step).unwrap_or_else(|_| {
        debug!("yowl panicked on {smiles}");
        Err(SmilesError::Aborted(smiles.to_owned()))
    })
}

fn read_graph(smiles: &str) -> Result<Vec<Atom>, SmilesError> {
    let mut builder = Builder::default();
    read(smiles, &mut builder, None)?;
    Ok(builder.build()?)
}

fn write_graph(atoms: Vec<Atom>) -> Result<String, SmilesError> {
    let mut writer = Writer::default();
    walk(atoms, &mut writer)?;
    Ok(writer.write())
}

#[derive(Clone, Debug, PartialEq)]
pub struct Molecule {
    atoms: Vec<AtomKind>,
    smiles: String,
    name: Option<String>,
}

impl Molecule {
    /// parse a SMILES string, optionally followed by whitespace and a title.
    /// Explicit hydrogens are folded into their neighbours, so for ordinary
    /// input the atom count is the heavy atom count
    pub fn parse(s: &str) -> Result<Self, SmilesError> {
        let s = s.trim();
        let (smiles, name) = match s.split_once(char::is_whitespace) {
            Some((smiles, name)) => (smiles, Some(name.trim().to_owned())),
            None => (s, None),
        };
        if smiles.is_empty() {
            return Err(SmilesError::Empty);
        }
        let graph = guarded(smiles, || read_graph(smiles))?;
        let graph = sanitize::remove_hydrogens(graph);
        sanitize::check(&graph)?;
        let atoms = graph.iter().map(|atom| atom.kind).collect();
        let written = guarded(smiles, move || write_graph(graph))?;
        Ok(Self {
            atoms,
            smiles: written,
            name,
        })
    }

    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn symbol(&self, atom: usize) -> &'static str {
        symbol(&self.atoms[atom])
    }

    pub fn formal_charge(&self, atom: usize) -> i8 {
        charge(&self.atoms[atom])
    }

    /// the molecule written back out by a depth-first walk. Not canonical:
    /// chains come out as they went in, but a ring is walked starting from
    /// its closing bond, so `c1ccccc1` becomes `c(ccccc1)1`
    pub fn smiles(&self) -> &str {
        &self.smiles
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl FromStr for Molecule {
    type Err = SmilesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
