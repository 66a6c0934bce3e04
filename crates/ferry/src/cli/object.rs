use std::process::ExitCode;

use anyhow::{Context, Result};
use ferry_transfer::{ObjectStore, Session};

use super::app::{LsArgs, PresignArgs, RmArgs};
use crate::ui::object_table;

pub async fn ls<S: ObjectStore>(session: &Session<S>, args: LsArgs) -> Result<ExitCode> {
    let objects = session
        .list_files(&args.prefix)
        .await
        .with_context(|| format!("failed to list {:?}", args.prefix))?;

    if args.long {
        println!("{}", object_table(&objects));
    } else {
        for object in &objects {
            println!("{}", session.public_url(&object.key));
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn rm<S: ObjectStore>(session: &Session<S>, args: RmArgs) -> Result<ExitCode> {
    for key in &args.keys {
        session
            .delete_file(key)
            .await
            .with_context(|| format!("failed to delete {key}"))?;
        println!("deleted {key}");
    }
    Ok(ExitCode::SUCCESS)
}

pub fn presign<S: ObjectStore>(session: &Session<S>, args: PresignArgs) -> Result<ExitCode> {
    let url = session
        .presigned_url(&args.key, args.expires)
        .with_context(|| format!("failed to presign {}", args.key))?;
    println!("{url}");
    Ok(ExitCode::SUCCESS)
}
