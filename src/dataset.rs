//! Retrieving a molecule generation dataset and splitting it into
//! train/valid/test groups.
//!
//! The known datasets are the ones the Therapeutics Data Commons serves for
//! its MolGen task. Their raw tables live on Harvard Dataverse; we fetch them
//! once into a local directory and reuse the copy on later runs.

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use log::{debug, info};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// cell values treated as missing, the same set pandas recognizes by default
pub const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan",
    "1.#IND", "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a",
    "nan", "null",
];

/// one row of a source table. Only the first field, the structure string, is
/// ever looked at
#[derive(Clone, Debug, PartialEq)]
pub struct RawRecord {
    fields: Vec<String>,
}

impl RawRecord {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// a record holding just a structure string, or nothing at all
    pub fn single(structure: Option<String>) -> Self {
        Self {
            fields: structure.into_iter().collect(),
        }
    }

    /// the structure string, unless the field is absent or a missing-data
    /// marker
    pub fn structure(&self) -> Option<&str> {
        let first = self.fields.first()?;
        if MISSING_MARKERS.contains(&first.trim()) {
            return None;
        }
        Some(first)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Tab,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "tab" | "tsv" => Ok(Self::Tab),
            _ => Err(Error::UnsupportedFormat(path.to_owned())),
        }
    }

    fn delimiter(&self) -> u8 {
        match self {
            TableFormat::Csv => b',',
            TableFormat::Tab => b'\t',
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            TableFormat::Csv => "csv",
            TableFormat::Tab => "tab",
        }
    }
}

/// a dataset the loader knows how to download
#[derive(Debug, PartialEq)]
pub struct KnownDataset {
    pub name: &'static str,
    /// Dataverse datafile id
    pub file_id: u32,
    pub format: TableFormat,
}

impl KnownDataset {
    /// name of the raw file inside the download directory
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name.to_lowercase(), self.format.extension())
    }
}

pub const REGISTRY: &[KnownDataset] = &[
    KnownDataset {
        name: "MOSES",
        file_id: 4170963,
        format: TableFormat::Tab,
    },
    KnownDataset {
        name: "ZINC",
        file_id: 4170960,
        format: TableFormat::Tab,
    },
    KnownDataset {
        name: "ChEMBL",
        file_id: 4170965,
        format: TableFormat::Tab,
    },
    KnownDataset {
        name: "ChEMBL_V29",
        file_id: 5767949,
        format: TableFormat::Csv,
    },
];

/// case-insensitive lookup in [REGISTRY]
pub fn lookup(name: &str) -> Result<&'static KnownDataset> {
    REGISTRY
        .iter()
        .find(|d| d.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| Error::UnknownDataset {
            name: name.to_owned(),
            known: REGISTRY
                .iter()
                .map(|d| d.name)
                .collect::<Vec<_>>()
                .join(", "),
        })
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// where raw downloads are kept between runs
    pub raw_dir: PathBuf,
    pub base_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("./data"),
            base_url: "https://dataverse.harvard.edu/api/access/datafile".to_owned(),
        }
    }
}

/// download `dataset` into `source.raw_dir`, or reuse an earlier download
/// unless `refresh` is set. Returns the path of the raw table
pub fn fetch(dataset: &KnownDataset, source: &SourceConfig, refresh: bool) -> Result<PathBuf> {
    let path = source.raw_dir.join(dataset.file_name());
    if path.exists() && !refresh {
        info!("found local copy of {} at {}", dataset.name, path.display());
        return Ok(path);
    }
    fs::create_dir_all(&source.raw_dir).map_err(|e| Error::io(&source.raw_dir, e))?;

    let url = format!("{}/{}", source.base_url.trim_end_matches('/'), dataset.file_id);
    info!("downloading {} from {url}", dataset.name);
    let http = |source| Error::Http {
        url: url.clone(),
        source,
    };
    // the larger tables take well over the default timeout
    let client = reqwest::blocking::Client::builder()
        .timeout(None::<Duration>)
        .build()
        .map_err(http)?;
    let mut response = client.get(&url).send().map_err(http)?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Status { url, status });
    }

    // an interrupted download must not look like a usable local copy
    let partial = path.with_extension("part");
    let file = File::create(&partial).map_err(|e| Error::io(&partial, e))?;
    let mut out = BufWriter::new(file);
    let bytes = response.copy_to(&mut out).map_err(http)?;
    out.flush().map_err(|e| Error::io(&partial, e))?;
    drop(out);
    debug!("downloaded {bytes} bytes");
    fs::rename(&partial, &path).map_err(|e| Error::io(&path, e))?;
    Ok(path)
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SplitConfig {
    pub seed: u64,
    /// train, valid and test fractions
    pub fractions: [f64; 3],
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            fractions: [0.7, 0.1, 0.2],
        }
    }
}

impl SplitConfig {
    fn validate(&self) -> Result<()> {
        let sum: f64 = self.fractions.iter().sum();
        if self.fractions.iter().any(|&f| !(0.0..=1.0).contains(&f)) || (sum - 1.0).abs() > 1e-6 {
            return Err(Error::SplitFractions(self.fractions));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Splits {
    pub train: Vec<RawRecord>,
    pub valid: Vec<RawRecord>,
    pub test: Vec<RawRecord>,
}

/// a whole table, before splitting
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    pub name: String,
    records: Vec<RawRecord>,
}

/// `round(n * frac)`, with ties going to the even neighbour
fn portion(n: usize, frac: f64) -> usize {
    ((n as f64 * frac).round_ties_even() as usize).min(n)
}

fn take(slots: &mut [Option<RawRecord>], idx: &[usize]) -> Vec<RawRecord> {
    idx.iter().filter_map(|&i| slots[i].take()).collect()
}

impl Dataset {
    pub fn new(name: impl Into<String>, records: Vec<RawRecord>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }

    /// read a delimited table with a header row. The delimiter comes from
    /// the file extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = TableFormat::from_path(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(format.delimiter())
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| Error::table(path, e))?;
        let mut records = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|e| Error::table(path, e))?;
            records.push(RawRecord::new(row.iter().map(str::to_owned).collect()));
        }
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!("read {} rows from {}", records.len(), path.display());
        Ok(Self { name, records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    /// consume `self` and split it at random. Test rows are drawn first and
    /// keep their drawn order, valid rows are drawn from what is left with a
    /// second generator, and the remaining train rows keep table order
    pub fn split(self, config: &SplitConfig) -> Result<Splits> {
        config.validate()?;
        let [_, valid_frac, test_frac] = config.fractions;
        let n = self.records.len();

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut rng);
        let test_idx = &order[..portion(n, test_frac)];

        let mut in_test = vec![false; n];
        for &i in test_idx {
            in_test[i] = true;
        }
        let rest: Vec<usize> = (0..n).filter(|&i| !in_test[i]).collect();

        let valid_frac = if test_frac < 1.0 {
            valid_frac / (1.0 - test_frac)
        } else {
            0.0
        };
        let mut rng = StdRng::seed_from_u64(1);
        let mut rest_order = rest.clone();
        rest_order.shuffle(&mut rng);
        let valid_idx = &rest_order[..portion(rest.len(), valid_frac)];

        let mut slots: Vec<Option<RawRecord>> = self.records.into_iter().map(Some).collect();
        let test = take(&mut slots, test_idx);
        let valid = take(&mut slots, valid_idx);
        let train = take(&mut slots, &rest);
        debug!(
            "split {} into {} train, {} valid, {} test",
            self.name,
            train.len(),
            valid.len(),
            test.len()
        );
        Ok(Splits { train, valid, test })
    }
}

/// fetch a registered dataset and split it
pub fn load_registered(
    name: &str,
    source: &SourceConfig,
    refresh: bool,
    split: &SplitConfig,
) -> Result<Splits> {
    let known = lookup(name)?;
    let path = fetch(known, source, refresh)?;
    Dataset::load(path)?.split(split)
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, io::Read, net::TcpListener, thread};

    use super::*;

    fn numbered(n: usize) -> Dataset {
        let records = (0..n)
            .map(|i| RawRecord::single(Some(format!("C{i}"))))
            .collect();
        Dataset::new("numbered", records)
    }

    fn ids(records: &[RawRecord]) -> Vec<usize> {
        records
            .iter()
            .map(|r| r.structure().unwrap()[1..].parse().unwrap())
            .collect()
    }

    #[test]
    fn missing_structures() {
        assert_eq!(RawRecord::single(None).structure(), None);
        assert_eq!(RawRecord::single(Some("nan".into())).structure(), None);
        assert_eq!(RawRecord::single(Some(" ".into())).structure(), None);
        assert_eq!(RawRecord::new(vec![]).structure(), None);
        let r = RawRecord::new(vec!["CCO".into(), "0.5".into()]);
        assert_eq!(r.structure(), Some("CCO"));
    }

    #[test]
    fn load_tab() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moses.tab");
        fs::write(&path, "smiles\tSPLIT\nCCO\ttrain\n\ttest\nc1ccccc1\ttest2\n").unwrap();
        let ds = Dataset::load(&path).unwrap();
        assert_eq!(ds.name, "moses");
        assert_eq!(ds.len(), 3);
        let got: Vec<_> = ds.records().iter().map(RawRecord::structure).collect();
        assert_eq!(got, vec![Some("CCO"), None, Some("c1ccccc1")]);
    }

    #[test]
    fn load_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chembl_v29.csv");
        fs::write(&path, "smiles\n\"CC(=O)O\"\nNaN\nCN\n").unwrap();
        let ds = Dataset::load(&path).unwrap();
        let got: Vec<_> = ds.records().iter().map(RawRecord::structure).collect();
        assert_eq!(got, vec![Some("CC(=O)O"), None, Some("CN")]);
    }

    #[test]
    fn unsupported_extension() {
        assert!(matches!(
            Dataset::load("molecules.sdf"),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn split_sizes() {
        let splits = numbered(100).split(&SplitConfig::default()).unwrap();
        assert_eq!(splits.test.len(), 20);
        assert_eq!(splits.valid.len(), 10);
        assert_eq!(splits.train.len(), 70);

        let all: HashSet<usize> = [&splits.train, &splits.valid, &splits.test]
            .into_iter()
            .flat_map(|s| ids(s))
            .collect();
        assert_eq!(all.len(), 100);

        // train keeps table order
        let train = ids(&splits.train);
        assert!(train.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn split_is_deterministic() {
        let config = SplitConfig::default();
        let a = numbered(57).split(&config).unwrap();
        let b = numbered(57).split(&config).unwrap();
        assert_eq!(a, b);

        let other = SplitConfig {
            seed: 7,
            ..Default::default()
        };
        let c = numbered(57).split(&other).unwrap();
        assert_ne!(ids(&a.test), ids(&c.test));
    }

    #[test]
    fn split_everything_into_train() {
        let config = SplitConfig {
            fractions: [1.0, 0.0, 0.0],
            ..Default::default()
        };
        let splits = numbered(10).split(&config).unwrap();
        assert_eq!(ids(&splits.train), (0..10).collect::<Vec<_>>());
        assert!(splits.valid.is_empty() && splits.test.is_empty());
    }

    #[test]
    fn bad_fractions() {
        for fractions in [[0.5, 0.1, 0.1], [1.2, -0.1, -0.1]] {
            let config = SplitConfig {
                fractions,
                ..Default::default()
            };
            assert!(matches!(
                numbered(10).split(&config),
                Err(Error::SplitFractions(_))
            ));
        }
    }

    #[test]
    fn registry() {
        assert_eq!(lookup("moses").unwrap().file_id, 4170963);
        assert_eq!(lookup("ChEMBL_v29").unwrap().file_name(), "chembl_v29.csv");
        let err = lookup("qm9").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown dataset 'qm9', expected one of MOSES, ZINC, ChEMBL, ChEMBL_V29"
        );
    }

    #[test]
    fn fetch_reuses_local_copy() {
        let dir = tempfile::tempdir().unwrap();
        let source = SourceConfig {
            raw_dir: dir.path().to_owned(),
            // nothing listens here, so any request would fail
            base_url: "http://127.0.0.1:9".to_owned(),
        };
        let known = lookup("ZINC").unwrap();
        let cached = dir.path().join("zinc.tab");
        fs::write(&cached, "smiles\nCCO\n").unwrap();
        assert_eq!(fetch(known, &source, false).unwrap(), cached);
        assert!(fetch(known, &source, true).is_err());
    }

    #[test]
    fn fetch_writes_the_body_to_disk() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let rows = format!("{}\ttrain\n", "C".repeat(150)).repeat(200);
        let body = format!("smiles\tSPLIT\n{rows}");
        let server = thread::spawn({
            let body = body.clone();
            move || {
                let (mut stream, _) = listener.accept().unwrap();
                let mut request = [0; 4096];
                let n = stream.read(&mut request).unwrap();
                assert!(request[..n].starts_with(b"GET /4170963 "));
                write!(
                    stream,
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                )
                .unwrap();
            }
        });

        let dir = tempfile::tempdir().unwrap();
        let source = SourceConfig {
            raw_dir: dir.path().join("raw"),
            base_url,
        };
        let known = lookup("MOSES").unwrap();
        let path = fetch(known, &source, true).unwrap();
        server.join().unwrap();
        assert_eq!(path, source.raw_dir.join(known.file_name()));
        assert_eq!(fs::read_to_string(&path).unwrap(), body);
        assert!(!path.with_extension("part").exists());
    }
}
