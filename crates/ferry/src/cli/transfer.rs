use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use ferry_transfer::{BatchReport, ObjectFilter, ObjectStore, Session};

use super::app::{DownloadArgs, DownloadFolderArgs, UploadArgs, UploadFolderArgs, UploadManyArgs};
use crate::ui::outcome_table;

pub async fn upload<S: ObjectStore>(session: &Session<S>, args: UploadArgs) -> Result<ExitCode> {
    let url = session
        .upload_file(&args.path, args.key.as_deref())
        .await
        .with_context(|| format!("failed to upload {}", args.path.display()))?;
    println!("{url}");
    Ok(ExitCode::SUCCESS)
}

pub async fn upload_many<S: ObjectStore>(session: &Session<S>, args: UploadManyArgs) -> Result<ExitCode> {
    let mappings = args.files.into_iter().map(|m| (m.path, m.key)).collect();
    let report = session.upload_many(mappings, concurrency(session)).await;
    Ok(summarize(&report))
}

pub async fn upload_folder<S: ObjectStore>(session: &Session<S>, args: UploadFolderArgs) -> Result<ExitCode> {
    let report = session
        .upload_folder(&args.dir, &args.prefix, concurrency(session))
        .await
        .with_context(|| format!("failed to read {}", args.dir.display()))?;
    Ok(summarize(&report))
}

pub async fn download<S: ObjectStore>(session: &Session<S>, args: DownloadArgs) -> Result<ExitCode> {
    let dest = match args.dest {
        Some(dest) => dest,
        None => default_destination(&args.key)?,
    };
    let path = session
        .download_file(&args.key, &dest)
        .await
        .with_context(|| format!("failed to download {}", args.key))?;
    println!("{}", path.display());
    Ok(ExitCode::SUCCESS)
}

pub async fn download_folder<S: ObjectStore>(session: &Session<S>, args: DownloadFolderArgs) -> Result<ExitCode> {
    let filter = ObjectFilter::new()
        .extensions(args.extensions)
        .min_size(args.min_size);
    let report = session
        .download_folder(&args.prefix, &args.dir, concurrency(session), &filter)
        .await
        .with_context(|| format!("failed to list {}", args.prefix))?;
    Ok(summarize(&report))
}

fn concurrency<S: ObjectStore>(session: &Session<S>) -> usize { session.manager().options().concurrency }

/// The key's last segment, in the working directory.
fn default_destination(key: &str) -> Result<PathBuf> {
    match key.rsplit('/').next() {
        Some(name) if !name.is_empty() && name != "." && name != ".." => Ok(PathBuf::from(name)),
        _ => bail!("cannot name a local file after key {key:?}; pass a destination"),
    }
}

/// Print the outcome table; failure if any item failed.
fn summarize(report: &BatchReport) -> ExitCode {
    if report.is_noop() {
        println!("nothing to {}", report.direction);
        return ExitCode::SUCCESS;
    }
    println!("{}", outcome_table(report));
    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
