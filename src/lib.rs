//! Filter a molecule generation dataset down to large cage-like structures
//! and write the survivors as train/test/valid SMILES files.

pub mod config;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod output;
pub mod pipeline;
pub mod smiles;
pub mod toolkit;

#[cfg(feature = "python")]
pub mod rdkit;
#[cfg(feature = "python")]
pub mod tdc;

pub use config::Config;
pub use dataset::{Dataset, RawRecord, Splits};
pub use error::{Error, Result};
pub use filter::{FilterConfig, MoleculeFilter, Rejection};
pub use pipeline::{Pipeline, Source, Summary};
pub use smiles::Molecule;
pub use toolkit::{Native, Structure, Toolkit};
