use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::model::PubStatus;

#[derive(Parser, Debug)]
#[command(
    name = "vitae",
    version,
    about = "Publication, citation, and funding statistics for an academic CV"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Counts(CountsArgs),
    Indices(IndicesArgs),
    Summary(SummaryArgs),
    Chart(ChartArgs),
    Refresh(RefreshArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CountsArgs {
    #[arg(long, default_value = "records.json")]
    pub records: PathBuf,

    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub post_appointment: bool,

    #[arg(long, default_value_t = false)]
    pub post_tenure: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum StatusCeiling {
    Published,
    Accepted,
    Submitted,
}

impl StatusCeiling {
    pub fn as_status(self) -> PubStatus {
        match self {
            Self::Published => PubStatus::Published,
            Self::Accepted => PubStatus::Accepted,
            Self::Submitted => PubStatus::Submitted,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct IndicesArgs {
    #[arg(long, default_value = "records.json")]
    pub records: PathBuf,

    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Most tentative publication status still counted by the indices.
    #[arg(long, value_enum, default_value_t = StatusCeiling::Published)]
    pub max_status: StatusCeiling,

    #[arg(long, default_value_t = false)]
    pub post_appointment: bool,

    #[arg(long, default_value_t = false)]
    pub post_tenure: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SummaryArgs {
    #[arg(long, default_value = "records.json")]
    pub records: PathBuf,

    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub post_appointment: bool,

    #[arg(long, default_value_t = false)]
    pub post_tenure: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ChartSeries {
    Publications,
    Citations,
    Funding,
}

#[derive(Args, Debug, Clone)]
pub struct ChartArgs {
    #[arg(long, default_value = "records.json")]
    pub records: PathBuf,

    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ChartSeries::Publications)]
    pub series: ChartSeries,

    /// Add a Web of Science series alongside Scopus on citation charts.
    #[arg(long, default_value_t = false)]
    pub with_wos: bool,

    /// Add a Google Scholar series alongside Scopus on citation charts.
    #[arg(long, default_value_t = false)]
    pub with_google: bool,

    #[arg(long, default_value_t = 12)]
    pub max_ticks: usize,

    /// Force the ordinate tick spacing instead of deriving it.
    #[arg(long)]
    pub delta: Option<u64>,

    #[arg(long, default_value_t = false)]
    pub post_appointment: bool,

    #[arg(long, default_value_t = false)]
    pub post_tenure: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RefreshArgs {
    #[arg(long, default_value = "records.json")]
    pub records: PathBuf,

    /// Fetched citation batch to reconcile against the records.
    #[arg(long)]
    pub updates: PathBuf,

    /// Where to write the updated record file; defaults to rewriting
    /// the records path in place.
    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub post_appointment: bool,

    #[arg(long, default_value_t = false)]
    pub post_tenure: bool,
}
