//! Subcommands and their handlers.

pub mod app;
mod object;
mod transfer;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use ferry_transfer::{ObjectStore, ProgressObserver, Session, TransferOptions};

pub use app::{App, Commands, GlobalArgs};

use crate::ui::ProgressBars;

/// Run one command against `store`, drawing progress on `bars`.
pub async fn run<S: ObjectStore>(
    cmd: Commands,
    store: Arc<S>,
    options: TransferOptions,
    bars: Arc<ProgressBars>,
) -> Result<ExitCode> {
    let observer: Arc<dyn ProgressObserver> = bars.clone();
    let session = Session::new(store, options)
        .context("invalid [transfer] settings")?
        .with_observer(observer);

    let code = match cmd {
        Commands::Upload(args) => transfer::upload(&session, args).await,
        Commands::UploadMany(args) => transfer::upload_many(&session, args).await,
        Commands::UploadFolder(args) => transfer::upload_folder(&session, args).await,
        Commands::Download(args) => transfer::download(&session, args).await,
        Commands::DownloadFolder(args) => transfer::download_folder(&session, args).await,
        Commands::Ls(args) => object::ls(&session, args).await,
        Commands::Rm(args) => object::rm(&session, args).await,
        Commands::Presign(args) => object::presign(&session, args),
    };
    bars.finish();
    code
}
