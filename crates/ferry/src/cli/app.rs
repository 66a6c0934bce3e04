use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::FerryConfig;

#[derive(Debug, Parser)]
#[command(
    name = "ferry",
    version = env!("CARGO_PKG_VERSION"),
    about = "Move files and whole folders between local disk and an S3 bucket",
    propagate_version = true
)]
pub struct App {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// TOML config file [default: ./ferry.toml when present]
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true)]
    pub bucket: Option<String>,

    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Base URL of an S3-compatible service; implies path-style addressing
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Files transferred at once in batch commands
    #[arg(short = 'j', long, global = true)]
    pub concurrency: Option<usize>,

    /// Hide progress bars
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl GlobalArgs {
    /// Flags win over every other configuration source.
    pub fn apply(&self, config: &mut FerryConfig) {
        if let Some(bucket) = &self.bucket {
            config.store.bucket = Some(bucket.clone());
        }
        if let Some(region) = &self.region {
            config.store.region = Some(region.clone());
        }
        if let Some(endpoint) = &self.endpoint {
            config.store.endpoint = Some(endpoint.clone());
            config.store.path_style = true;
        }
        if let Some(concurrency) = self.concurrency {
            config.transfer.concurrency = concurrency;
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Upload one file
    #[command(alias = "up")]
    Upload(UploadArgs),
    /// Upload a list of files as one batch
    UploadMany(UploadManyArgs),
    /// Upload every file under a folder, keeping its structure
    UploadFolder(UploadFolderArgs),
    /// Download one object
    #[command(alias = "get")]
    Download(DownloadArgs),
    /// Download every object under a prefix, recreating its structure
    DownloadFolder(DownloadFolderArgs),
    /// Print the public URL of every object under a prefix
    #[command(alias = "list")]
    Ls(LsArgs),
    /// Delete objects
    #[command(alias = "remove")]
    Rm(RmArgs),
    /// Print a time-limited download URL
    Presign(PresignArgs),
}

#[derive(Debug, Clone, Args)]
pub struct UploadArgs {
    pub path: PathBuf,
    /// Object key [default: the file name]
    #[arg(short, long)]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct UploadManyArgs {
    /// `PATH` or `PATH=KEY`; a bare path is stored under its file name
    #[arg(required = true)]
    pub files: Vec<Mapping>,
}

#[derive(Debug, Clone, Args)]
pub struct UploadFolderArgs {
    pub dir:    PathBuf,
    /// Key prefix for the uploaded files; empty for the bucket root
    #[arg(default_value = "")]
    pub prefix: String,
}

#[derive(Debug, Clone, Args)]
pub struct DownloadArgs {
    pub key:  String,
    /// Destination file [default: the key's last segment]
    pub dest: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct DownloadFolderArgs {
    pub prefix:     String,
    pub dir:        PathBuf,
    /// Only download these extensions, e.g. `--ext webp,jpg`
    #[arg(long = "ext", value_delimiter = ',')]
    pub extensions: Vec<String>,
    /// Skip objects smaller than this many bytes; empty objects are always skipped
    #[arg(long, default_value_t = 1)]
    pub min_size:   u64,
}

#[derive(Debug, Clone, Args)]
pub struct LsArgs {
    #[arg(default_value = "")]
    pub prefix: String,
    /// Show keys and sizes instead of URLs
    #[arg(short, long)]
    pub long:   bool,
}

#[derive(Debug, Clone, Args)]
pub struct RmArgs {
    #[arg(required = true)]
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct PresignArgs {
    pub key:     String,
    /// Lifetime such as `900`, `15m`, `12h` or `7d`
    #[arg(short, long, default_value = "1h", value_parser = parse_ttl)]
    pub expires: Duration,
}

/// A local file and the key to store it under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub path: PathBuf,
    pub key:  Option<String>,
}

impl FromStr for Mapping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (path, key) = match s.split_once('=') {
            Some((_, "")) => return Err(format!("empty key in {s:?}")),
            Some((path, key)) => (path, Some(key.to_string())),
            None => (s, None),
        };
        if path.is_empty() {
            return Err(format!("empty path in {s:?}"));
        }
        Ok(Self {
            path: PathBuf::from(path),
            key,
        })
    }
}

pub fn parse_ttl(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let n: u64 = digits.parse().map_err(|_| format!("invalid duration {s:?}"))?;
    let scale = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return Err(format!("unknown unit {unit:?} in {s:?}; use s, m, h or d")),
    };
    n.checked_mul(scale)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration {s:?} is too large"))
}
