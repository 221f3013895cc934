use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser, ValueEnum};
use log::debug;
use molsieve::{Config, Native, Pipeline, Source};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ToolkitChoice {
    /// SMILES reading and writing through yowl
    Native,
    /// RDKit through python, needs the `python` feature
    Rdkit,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SourceChoice {
    /// download the raw table from Harvard Dataverse
    Dataverse,
    /// let the TDC python package download and split, needs the `python`
    /// feature
    Tdc,
}

/// Filter a molecule generation dataset into train/test/valid SMILES files
#[derive(Parser, Debug)]
#[command(name = "molsieve", version)]
#[command(group(ArgGroup::new("name").required(true).args(["dataset", "dataset_pos"])))]
struct Cli {
    /// Dataset name: MOSES, ZINC, ChEMBL or ChEMBL_V29
    #[arg(long, value_name = "NAME")]
    dataset: Option<String>,

    #[arg(value_name = "NAME", hide = true)]
    dataset_pos: Option<String>,

    /// Read this local .csv/.tsv/.tab table instead of downloading
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// JSON file with filter, split, output and source settings
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory the per-dataset output directory is created in
    #[arg(long, value_name = "DIR")]
    output_root: Option<PathBuf>,

    /// Directory raw downloads are kept in
    #[arg(long, value_name = "DIR")]
    raw_dir: Option<PathBuf>,

    /// Seed for the random split
    #[arg(long, value_name = "N")]
    seed: Option<u64>,

    /// Download again even if a local copy exists
    #[arg(long)]
    refresh: bool,

    /// Leave out the `SMILES Name` header line
    #[arg(long)]
    no_header: bool,

    /// Write only the SMILES on each line
    #[arg(long)]
    no_names: bool,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,

    #[arg(long, value_enum, default_value = "native")]
    toolkit: ToolkitChoice,

    #[arg(long, value_enum, default_value = "dataverse", conflicts_with = "input")]
    source: SourceChoice,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(root) = &self.output_root {
            config.output.root = root.clone();
        }
        if let Some(dir) = &self.raw_dir {
            config.source.raw_dir = dir.clone();
        }
        if let Some(seed) = self.seed {
            config.split.seed = seed;
        }
        if self.no_header {
            config.output.header = false;
        }
        if self.no_names {
            config.output.names = false;
        }
    }

    fn source(&self) -> anyhow::Result<Source> {
        if let Some(path) = &self.input {
            return Ok(Source::File(path.clone()));
        }
        match self.source {
            SourceChoice::Dataverse => Ok(Source::Registry {
                refresh: self.refresh,
            }),
            #[cfg(feature = "python")]
            SourceChoice::Tdc => Ok(Source::Tdc),
            #[cfg(not(feature = "python"))]
            SourceChoice::Tdc => {
                anyhow::bail!("--source tdc needs molsieve built with the `python` feature")
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let name = cli
        .dataset
        .clone()
        .or_else(|| cli.dataset_pos.clone())
        .context("no dataset name given")?;

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };
    cli.apply(&mut config);
    debug!("{config:?}");

    let source = cli.source()?;
    let pipeline = Pipeline::new(&name, config).quiet(cli.quiet);
    let summary = match cli.toolkit {
        ToolkitChoice::Native => pipeline.run(Native, &source),
        #[cfg(feature = "python")]
        ToolkitChoice::Rdkit => {
            let rdkit = molsieve::rdkit::Rdkit::new().context("initializing RDKit")?;
            pipeline.run(rdkit, &source)
        }
        #[cfg(not(feature = "python"))]
        ToolkitChoice::Rdkit => {
            anyhow::bail!("--toolkit rdkit needs molsieve built with the `python` feature")
        }
    }
    .with_context(|| format!("preparing the {name} dataset"))?;

    debug!("{summary:?}");
    Ok(())
}
