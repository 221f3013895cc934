use std::{fs::File, io::BufReader, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    dataset::{SourceConfig, SplitConfig},
    error::{Error, Result},
    filter::FilterConfig,
    output::OutputConfig,
};

/// Everything that can be tuned from a JSON file. Every section and field is
/// optional, e.g.
///
/// ```json
/// { "filter": { "max_atoms": 300 }, "split": { "seed": 7 } }
/// ```
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub filter: FilterConfig,
    pub split: SplitConfig,
    pub output: OutputConfig,
    pub source: SourceConfig,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_reader(BufReader::new(f)).map_err(|source| Error::Config {
            path: path.to_owned(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use super::*;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.filter.min_atoms, 100);
        assert_eq!(c.filter.max_atoms, 220);
        assert_eq!(c.filter.charges, vec![-1, 0, 1]);
        assert_eq!(
            c.filter.elements,
            vec!["C", "N", "O", "P", "Fe", "Co", "Ni", "Zn"]
        );
        assert_eq!(c.split.seed, 42);
        assert_eq!(c.split.fractions, [0.7, 0.1, 0.2]);
        assert_eq!(c.output.root, PathBuf::from("./data/pre-training"));
        assert_eq!(c.source.raw_dir, PathBuf::from("./data"));
    }

    #[test]
    fn partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"filter": {"max_atoms": 300, "elements": ["C", "S"]}, "output": {"header": false}}"#,
        )
        .unwrap();
        let c = Config::load(&path).unwrap();
        assert_eq!(c.filter.min_atoms, 100);
        assert_eq!(c.filter.max_atoms, 300);
        assert_eq!(c.filter.elements, vec!["C", "S"]);
        assert!(!c.output.header);
        assert!(c.output.names);
        assert_eq!(c.split, SplitConfig::default());
    }

    #[test]
    fn bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"filter": {"max_atom": 300}}"#).unwrap();
        assert!(matches!(Config::load(&path), Err(Error::Config { .. })));
        assert!(matches!(
            Config::load(dir.path().join("missing.json")),
            Err(Error::Io { .. })
        ));
    }
}
