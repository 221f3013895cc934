//! Loading splits straight from the Therapeutics Data Commons python package.

use std::path::Path;

use log::info;
use pyo3::{
    prelude::{PyAnyMethods, PyDictMethods},
    types::{PyDict, PyModule},
    Bound, PyAny, PyResult, Python,
};

use crate::{
    dataset::{RawRecord, Splits},
    error::Result,
};

/// the first column of every row of a pandas DataFrame. Anything that is not
/// a string, NaN in particular, becomes a missing structure
fn first_column(frame: &Bound<'_, PyAny>) -> PyResult<Vec<RawRecord>> {
    let rows = frame.getattr("values")?.call_method0("tolist")?;
    let mut ret = Vec::new();
    for row in rows.iter()? {
        let first = row?.get_item(0)?;
        ret.push(RawRecord::single(first.extract::<String>().ok()));
    }
    Ok(ret)
}

/// `MolGen(name=name, path=raw_dir).get_split()`, using TDC's default
/// random split
pub fn load(name: &str, raw_dir: &Path) -> Result<Splits> {
    info!("loading {name} through tdc.generation.MolGen");
    let splits = Python::with_gil(|py| -> PyResult<Splits> {
        let molgen = PyModule::import_bound(py, "tdc.generation")?.getattr("MolGen")?;
        let kwargs = PyDict::new_bound(py);
        kwargs.set_item("name", name)?;
        kwargs.set_item("path", &*raw_dir.to_string_lossy())?;
        let split = molgen.call((), Some(&kwargs))?.call_method0("get_split")?;
        Ok(Splits {
            train: first_column(&split.get_item("train")?)?,
            valid: first_column(&split.get_item("valid")?)?,
            test: first_column(&split.get_item("test")?)?,
        })
    })?;
    Ok(splits)
}
