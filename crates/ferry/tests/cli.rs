use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use ferry::cli::app::{DownloadArgs, DownloadFolderArgs, Mapping, UploadFolderArgs, UploadManyArgs};
use ferry::cli::{self, App, Commands};
use ferry::config::FerryConfig;
use ferry::ui::ProgressBars;
use ferry_transfer::{MemoryStore, TransferOptions};
use tempfile::tempdir;

#[test]
fn parses_global_flags_after_subcommand() {
    let app = App::try_parse_from([
        "ferry",
        "upload-folder",
        "./frames",
        "keyframes",
        "-j",
        "32",
        "--bucket",
        "media",
    ])
    .unwrap();

    assert_eq!(app.global.concurrency, Some(32));
    assert_eq!(app.global.bucket.as_deref(), Some("media"));
    match app.cmd {
        Commands::UploadFolder(args) => {
            assert_eq!(args.dir, PathBuf::from("./frames"));
            assert_eq!(args.prefix, "keyframes");
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parses_filters_and_ttls() {
    let app = App::try_parse_from(["ferry", "download-folder", "kf", "out", "--ext", "webp,.JPG"]).unwrap();
    match app.cmd {
        Commands::DownloadFolder(args) => {
            assert_eq!(args.extensions, vec!["webp", ".JPG"]);
            assert_eq!(args.min_size, 1);
        }
        other => panic!("unexpected command: {other:?}"),
    }

    let app = App::try_parse_from(["ferry", "presign", "a.txt"]).unwrap();
    match app.cmd {
        Commands::Presign(args) => assert_eq!(args.expires, Duration::from_secs(3600)),
        other => panic!("unexpected command: {other:?}"),
    }

    assert!(App::try_parse_from(["ferry", "presign", "a.txt", "--expires", "2w"]).is_err());
    assert!(App::try_parse_from(["ferry", "rm"]).is_err());
}

#[test]
fn config_layers_in_order() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "ferry.toml",
            r#"
            log_level = "debug"

            [store]
            bucket = "from-file"
            region = "eu-central-1"

            [transfer]
            concurrency = 32
            storage_class = "STANDARD_IA"
            "#,
        )?;
        jail.set_env("AWS_ACCESS_KEY_ID", "AKID");
        jail.set_env("AWS_REGION", "us-west-2");
        jail.set_env("FERRY_STORE__BUCKET", "from-env");
        jail.set_env("FERRY_TRANSFER__PART_CONCURRENCY", "4");

        let config = FerryConfig::load(None)?;
        assert_eq!(config.store.bucket.as_deref(), Some("from-env"));
        assert_eq!(config.store.region.as_deref(), Some("eu-central-1"));
        assert_eq!(config.store.access_key_id.as_deref(), Some("AKID"));
        assert_eq!(config.transfer.concurrency, 32);
        assert_eq!(config.transfer.part_concurrency, 4);
        assert_eq!(config.transfer.storage_class, "STANDARD_IA");
        assert_eq!(config.transfer.part_size, TransferOptions::default().part_size);
        assert_eq!(config.log_level, "debug");
        Ok(())
    });
}

#[test]
fn missing_explicit_config_file_is_an_error() {
    figment::Jail::expect_with(|_| {
        assert!(FerryConfig::load(Some(PathBuf::from("nope.toml").as_path())).is_err());
        Ok(())
    });
}

#[tokio::test]
async fn folder_commands_round_trip_through_a_store() {
    let src = tempdir().unwrap();
    std::fs::create_dir_all(src.path().join("L01")).unwrap();
    std::fs::write(src.path().join("L01/001.webp"), b"frame").unwrap();
    std::fs::write(src.path().join("notes.txt"), b"notes").unwrap();

    let store = Arc::new(MemoryStore::new("media"));
    let bars = Arc::new(ProgressBars::hidden());

    let up = Commands::UploadFolder(UploadFolderArgs {
        dir:    src.path().to_path_buf(),
        prefix: "keyframes".into(),
    });
    let code = cli::run(up, Arc::clone(&store), TransferOptions::default(), Arc::clone(&bars)).await.unwrap();
    assert_eq!(code, ExitCode::SUCCESS);
    assert_eq!(store.keys(), vec!["keyframes/L01/001.webp", "keyframes/notes.txt"]);
    assert_eq!(bars.position("keyframes"), Some(10));

    let dst = tempdir().unwrap();
    let down = Commands::DownloadFolder(DownloadFolderArgs {
        prefix:     "keyframes".into(),
        dir:        dst.path().to_path_buf(),
        extensions: vec!["webp".into()],
        min_size:   1,
    });
    let code = cli::run(down, Arc::clone(&store), TransferOptions::default(), Arc::clone(&bars)).await.unwrap();
    assert_eq!(code, ExitCode::SUCCESS);
    assert_eq!(std::fs::read(dst.path().join("L01/001.webp")).unwrap(), b"frame");
    assert!(!dst.path().join("notes.txt").exists());
}

#[tokio::test]
async fn failed_items_give_a_failure_exit_code() {
    let dir = tempdir().unwrap();
    let present = dir.path().join("present.txt");
    std::fs::write(&present, b"here").unwrap();

    let store = Arc::new(MemoryStore::default());
    let cmd = Commands::UploadMany(UploadManyArgs {
        files: vec![
            Mapping {
                path: present,
                key:  Some("docs/present.txt".into()),
            },
            Mapping {
                path: dir.path().join("absent.txt"),
                key:  None,
            },
        ],
    });
    let code = cli::run(cmd, Arc::clone(&store), TransferOptions::default(), Arc::new(ProgressBars::hidden()))
        .await
        .unwrap();

    assert_eq!(code, ExitCode::FAILURE);
    assert_eq!(store.keys(), vec!["docs/present.txt"]);
}

#[tokio::test]
async fn missing_object_fails_the_download_command() {
    let dir = tempdir().unwrap();
    let cmd = Commands::Download(DownloadArgs {
        key:  "missing.bin".into(),
        dest: Some(dir.path().join("missing.bin")),
    });
    let err = cli::run(
        cmd,
        Arc::new(MemoryStore::default()),
        TransferOptions::default(),
        Arc::new(ProgressBars::hidden()),
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("failed to download missing.bin"));
}
