//! Output directory bookkeeping and the `.smi` split files.

use std::{
    borrow::Cow,
    collections::BTreeMap,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    dataset::RawRecord,
    error::{Error, Result},
    filter::MoleculeFilter,
    toolkit::{Structure, Toolkit},
};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// per-dataset directories are created under here
    pub root: PathBuf,
    /// start each file with a `SMILES Name` line
    pub header: bool,
    /// follow each SMILES with its title or running index
    pub names: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./data/pre-training"),
            header: true,
            names: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirState {
    Created,
    /// the directory existed and was wiped
    Recreated,
}

/// make sure `path` exists and is empty, deleting whatever was there
pub fn ensure_empty_dir(path: &Path) -> Result<DirState> {
    let state = match fs::symlink_metadata(path) {
        Ok(meta) => {
            if meta.is_dir() {
                fs::remove_dir_all(path)
            } else {
                fs::remove_file(path)
            }
            .map_err(|e| Error::io(path, e))?;
            DirState::Recreated
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => DirState::Created,
        Err(e) => return Err(Error::io(path, e)),
    };
    fs::create_dir_all(path).map_err(|e| Error::io(path, e))?;
    Ok(state)
}

/// Writes molecules in the layout of RDKit's `SmilesWriter`: an optional
/// header, then one `<smiles> <name>` line per molecule, where molecules
/// without a title are named by their 0-based position in the file
pub struct SmilesWriter<W: Write> {
    inner: W,
    names: bool,
    count: usize,
}

impl<W: Write> SmilesWriter<W> {
    pub fn new(mut inner: W, header: bool, names: bool) -> io::Result<Self> {
        if header {
            let line = if names { "SMILES Name" } else { "SMILES" };
            writeln!(inner, "{line}")?;
        }
        Ok(Self {
            inner,
            names,
            count: 0,
        })
    }

    pub fn write<S: Structure>(&mut self, mol: &S) -> io::Result<()> {
        let smiles = mol.to_smiles();
        if self.names {
            let name = mol
                .name()
                .map(Cow::Borrowed)
                .unwrap_or_else(|| Cow::Owned(self.count.to_string()));
            writeln!(self.inner, "{smiles} {name}")?;
        } else {
            writeln!(self.inner, "{smiles}")?;
        }
        self.count += 1;
        Ok(())
    }

    /// number of molecules written so far
    pub fn count(&self) -> usize {
        self.count
    }

    /// flush and hand back the underlying writer
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SplitReport {
    pub read: usize,
    pub accepted: usize,
    /// rejections by [crate::filter::Rejection::kind]
    pub rejected: BTreeMap<&'static str, usize>,
}

impl SplitReport {
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }
}

/// filter `records` and stream the accepted molecules to a new file at
/// `path`, keeping their order
pub fn write_split<T: Toolkit>(
    path: &Path,
    records: &[RawRecord],
    filter: &MoleculeFilter<T>,
    config: &OutputConfig,
) -> Result<SplitReport> {
    let io_err = |e| Error::io(path, e);
    let file = File::create(path).map_err(io_err)?;
    let mut writer =
        SmilesWriter::new(BufWriter::new(file), config.header, config.names).map_err(io_err)?;
    let mut report = SplitReport::default();
    for record in records {
        report.read += 1;
        match filter.screen(record.structure()) {
            Ok(mol) => {
                writer.write(&mol).map_err(io_err)?;
                report.accepted += 1;
            }
            Err(rejection) => *report.rejected.entry(rejection.kind()).or_default() += 1,
        }
    }
    writer.finish().map_err(io_err)?;
    debug!(
        "{}: kept {} of {} rows, rejected {:?}",
        path.display(),
        report.accepted,
        report.read,
        report.rejected
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use crate::{filter::FilterConfig, toolkit::Native};

    use super::*;

    #[test]
    fn fresh_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("pre-training").join("MOSES");
        assert_eq!(ensure_empty_dir(&dir).unwrap(), DirState::Created);
        assert!(dir.is_dir());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn stale_files_are_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("MOSES");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("train.smi"), "stale\n").unwrap();
        fs::write(dir.join("nested").join("old.txt"), "stale\n").unwrap();
        let sibling = tmp.path().join("ZINC");
        fs::create_dir(&sibling).unwrap();
        fs::write(sibling.join("keep.smi"), "keep\n").unwrap();

        assert_eq!(ensure_empty_dir(&dir).unwrap(), DirState::Recreated);
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
        // running again ends up in the same place
        assert_eq!(ensure_empty_dir(&dir).unwrap(), DirState::Recreated);
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
        // nothing else is touched
        assert!(sibling.join("keep.smi").exists());
    }

    #[test]
    fn file_in_the_way() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("MOSES");
        fs::write(&dir, "not a directory").unwrap();
        assert_eq!(ensure_empty_dir(&dir).unwrap(), DirState::Recreated);
        assert!(dir.is_dir());
    }

    #[test]
    fn smiles_writer_layout() {
        let mols = ["CCO", "c1ccccc1 benzene", "C#N"]
            .map(|s| crate::smiles::Molecule::parse(s).unwrap());

        let mut w = SmilesWriter::new(Vec::new(), true, true).unwrap();
        for mol in &mols {
            w.write(mol).unwrap();
        }
        assert_eq!(w.count(), 3);
        let got = String::from_utf8(w.finish().unwrap()).unwrap();
        assert_eq!(got, "SMILES Name\nCCO 0\nc(ccccc1)1 benzene\nC#N 2\n");

        let mut w = SmilesWriter::new(Vec::new(), false, false).unwrap();
        for mol in &mols {
            w.write(mol).unwrap();
        }
        let got = String::from_utf8(w.finish().unwrap()).unwrap();
        assert_eq!(got, "CCO\nc(ccccc1)1\nC#N\n");
    }

    #[test]
    fn split_keeps_order() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("train.smi");
        let filter = MoleculeFilter::new(
            Native,
            FilterConfig {
                min_atoms: 1,
                ..Default::default()
            },
        );
        let records: Vec<_> = ["CCCO", "CCl", "nan", "CCCCN", "C1CC", "CCCCCP"]
            .into_iter()
            .map(|s| RawRecord::single(Some(s.to_owned())))
            .chain([RawRecord::single(None)])
            .collect();
        let config = OutputConfig {
            header: false,
            ..Default::default()
        };
        let report = write_split(&path, &records, &filter, &config).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "CCCO 0\nCCCCN 1\nCCCCCP 2\n");
        assert_eq!(report.read, 7);
        assert_eq!(report.accepted, 3);
        assert_eq!(report.rejected_total(), 4);
        assert_eq!(report.rejected.get("unparsable"), Some(&3));
        assert_eq!(report.rejected.get("element"), Some(&1));
    }
}
