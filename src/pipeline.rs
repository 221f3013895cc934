//! The whole run: clean output directory, load and split the dataset, filter
//! each split into its `.smi` file.

use std::path::{Component, Path, PathBuf};

use log::info;

use crate::{
    config::Config,
    dataset::{self, Dataset, Splits},
    error::{Error, Result},
    filter::MoleculeFilter,
    output::{ensure_empty_dir, write_split, DirState, SplitReport},
    toolkit::Toolkit,
};

/// where the rows come from
#[derive(Clone, Debug, PartialEq)]
pub enum Source {
    /// a dataset from [dataset::REGISTRY], downloaded unless a local copy
    /// exists or `refresh` is set
    Registry { refresh: bool },
    /// a local table, split the same way a downloaded one would be
    File(PathBuf),
    /// the Therapeutics Data Commons python package, splits included
    #[cfg(feature = "python")]
    Tdc,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    pub dir: PathBuf,
    pub dir_state: DirState,
    pub train: SplitReport,
    pub test: SplitReport,
    pub valid: SplitReport,
}

/// the name becomes a directory under the output root, so it has to be one
/// plain path component. Anything else could point the wipe at the root
/// itself or outside it
fn check_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(Error::InvalidName(name.to_owned())),
    }
}

pub struct Pipeline {
    dataset: String,
    config: Config,
    quiet: bool,
}

impl Pipeline {
    pub fn new(dataset: impl Into<String>, config: Config) -> Self {
        Self {
            dataset: dataset.into(),
            config,
            quiet: false,
        }
    }

    /// suppress the progress lines on stdout
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// `<output root>/<dataset>`
    pub fn output_dir(&self) -> PathBuf {
        self.config.output.root.join(&self.dataset)
    }

    fn say(&self, msg: impl AsRef<str>) {
        if !self.quiet {
            println!("{}", msg.as_ref());
        }
    }

    fn load(&self, source: &Source) -> Result<Splits> {
        match source {
            Source::Registry { refresh } => dataset::load_registered(
                &self.dataset,
                &self.config.source,
                *refresh,
                &self.config.split,
            ),
            Source::File(path) => Dataset::load(path)?.split(&self.config.split),
            #[cfg(feature = "python")]
            Source::Tdc => crate::tdc::load(&self.dataset, &self.config.source.raw_dir),
        }
    }

    fn save<T: Toolkit>(
        &self,
        label: &str,
        path: &Path,
        records: &[dataset::RawRecord],
        filter: &MoleculeFilter<T>,
    ) -> Result<SplitReport> {
        self.say(format!("-- Saving {label} data..."));
        let report = write_split(path, records, filter, &self.config.output)?;
        info!(
            "{label}: kept {} of {} molecules in {}",
            report.accepted,
            report.read,
            path.display()
        );
        Ok(report)
    }

    /// filter every split into `<output root>/<dataset>`. Nothing on disk is
    /// touched until the name has been checked
    pub fn run<T: Toolkit>(&self, toolkit: T, source: &Source) -> Result<Summary> {
        check_name(&self.dataset)?;
        if let Source::Registry { .. } = source {
            dataset::lookup(&self.dataset)?;
        }

        let dir = self.output_dir();
        let dir_state = ensure_empty_dir(&dir)?;
        match dir_state {
            DirState::Created => {
                self.say(format!("-- Creating dataset at {}", dir.display()));
            }
            DirState::Recreated => {
                self.say(format!("-- Removed old directory at {}", dir.display()));
                self.say(format!("-- Creating new dataset at {}", dir.display()));
            }
        }

        self.say(format!("* Loading {} dataset.", self.dataset));
        let splits = self.load(source)?;

        self.say(format!("* Re-saving {} dataset as SMILES.", self.dataset));
        let filter = MoleculeFilter::new(toolkit, self.config.filter.clone());
        let train = self.save("training", &dir.join("train.smi"), &splits.train, &filter)?;
        let test = self.save("testing", &dir.join("test.smi"), &splits.test, &filter)?;
        let valid = self.save("validation", &dir.join("valid.smi"), &splits.valid, &filter)?;
        self.say("Done.");

        Ok(Summary {
            dir,
            dir_state,
            train,
            test,
            valid,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::toolkit::Native;

    use super::*;

    #[test]
    fn names_are_single_components() {
        for name in ["MOSES", "ChEMBL_V29", "my.data"] {
            assert!(check_name(name).is_ok(), "{name}");
        }
        for name in ["", ".", "..", "/", "../MOSES", "MOSES/..", "a/b", "./MOSES"] {
            assert!(
                matches!(check_name(name), Err(Error::InvalidName(_))),
                "{name:?}"
            );
        }
    }

    #[test]
    fn bad_names_leave_the_disk_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("pre-training");
        let sibling = root.join("ZINC");
        fs::create_dir_all(&sibling).unwrap();
        fs::write(sibling.join("train.smi"), "SMILES Name\n").unwrap();

        let mut config = Config::default();
        config.output.root = root.clone();
        config.source.raw_dir = tmp.path().join("raw");
        for name in ["", "..", "."] {
            let pipeline = Pipeline::new(name, config.clone()).quiet(true);
            let err = pipeline
                .run(Native, &Source::Registry { refresh: false })
                .unwrap_err();
            assert!(matches!(err, Error::InvalidName(_)), "{name:?}");
        }
        assert!(sibling.join("train.smi").exists());
        assert!(!tmp.path().join("raw").exists());
    }
}
