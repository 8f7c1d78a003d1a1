use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "gnome-inventory",
    version,
    about = "Load inventory spreadsheets into the gnome document store"
)]
pub struct Cli {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Load(LoadArgs),
    Status(StatusArgs),
    Find(FindArgs),
    Distinct(DistinctArgs),
    Last(LastArgs),
    AddUser(AddUserArgs),
}

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, value_enum)]
    pub environment: Option<Environment>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }

    pub fn database_name(self) -> &'static str {
        self.as_str()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum LoadMode {
    Import,
    Synthetic,
}

impl LoadMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Synthetic => "synthetic",
        }
    }

    pub fn row_failure_policy(self) -> RowFailurePolicy {
        match self {
            Self::Import => RowFailurePolicy::SkipRow,
            Self::Synthetic => RowFailurePolicy::AbortBatch,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RowFailurePolicy {
    SkipRow,
    AbortBatch,
}

impl RowFailurePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SkipRow => "skip-row",
            Self::AbortBatch => "abort-batch",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
    #[arg(long)]
    pub source: PathBuf,

    #[arg(long, default_value = "inventory")]
    pub collection: String,

    #[arg(long, value_enum, default_value_t = LoadMode::Import)]
    pub mode: LoadMode,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long)]
    pub report_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {}

#[derive(Args, Debug, Clone)]
pub struct FindArgs {
    #[arg(long)]
    pub collection: String,

    #[arg(long, default_value = "{}")]
    pub filter: String,

    #[arg(long = "sort")]
    pub sort: Vec<String>,

    #[arg(long, default_value_t = 0)]
    pub limit: usize,

    #[arg(long)]
    pub projection: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DistinctArgs {
    #[arg(long)]
    pub collection: String,

    #[arg(long)]
    pub field: String,
}

#[derive(Args, Debug, Clone)]
pub struct LastArgs {
    #[arg(long)]
    pub collection: String,

    #[arg(long, default_value = "_id")]
    pub field: String,
}

#[derive(Args, Debug, Clone)]
pub struct AddUserArgs {
    #[arg(long)]
    pub user: String,

    #[arg(long)]
    pub password: String,
}
