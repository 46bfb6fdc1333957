//! MPQ source against an installation written to a temp directory

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use std::sync::Arc;

use common::{mpq_install, sword_texture};
use hoard_storage::listfile::FormatOptions;
use hoard_storage::{ErrorKind, ListfileIndex, MpqSource, StorageConfig};
use pretty_assertions::assert_eq;

async fn open(install: &std::path::Path) -> MpqSource {
    MpqSource::open(install, Arc::new(ListfileIndex::new()), &StorageConfig::default())
        .await
        .expect("open installation")
}

#[tokio::test]
async fn test_locale_from_config_wtf() {
    let install = mpq_install();
    let mpq = open(install.path()).await;

    assert_eq!(mpq.locale(), "enGB");
    assert_eq!(mpq.archive_paths().len(), 3);
    assert!(mpq.archive_paths()[1].ends_with("enGB/locale-enGB.MPQ"));
}

#[tokio::test]
async fn test_missing_config_defaults_to_enus() {
    let install = mpq_install();
    std::fs::remove_file(install.path().join("wtf/config.wtf")).unwrap();
    let mpq = open(install.path()).await;

    assert_eq!(mpq.locale(), "enUS");
    // No Data/enUS, so only the unlocalized archives load
    assert_eq!(mpq.archive_paths().len(), 2);
    assert_eq!(mpq.file_count(), 4);
}

#[tokio::test]
async fn test_ids_follow_load_order() {
    let install = mpq_install();
    let mpq = open(install.path()).await;
    let listfile = mpq.listfile();

    assert_eq!(mpq.file_count(), 6);
    assert_eq!(
        listfile.full_listfile(FormatOptions {
            sort_by_id: true,
            show_file_data_ids: true,
        }),
        vec![
            "interface/icons/sword.blp [1]",
            "dbfilesclient/map.dbc [2]",
            "readme.txt [3]",
            "sound/hello.wav [4]",
            "secret.bin [5]",
            "interface/new.txt [6]",
        ]
    );
}

#[tokio::test]
async fn test_patch_overrides_and_keeps_id() {
    let install = mpq_install();
    let mpq = open(install.path()).await;

    assert_eq!(mpq.listfile().get_by_filename("README.TXT"), Some(3));
    assert_eq!(mpq.get_file(3).await.unwrap(), b"patched readme");
    assert_eq!(
        mpq.get_file_by_name("readme.txt").await.unwrap(),
        b"patched readme"
    );
}

#[tokio::test]
async fn test_read_by_id_and_name() {
    let install = mpq_install();
    let mpq = open(install.path()).await;

    assert_eq!(mpq.get_file(1).await.unwrap(), sword_texture());
    assert_eq!(
        mpq.get_file_by_name("interface/icons/SWORD.blp").await.unwrap(),
        sword_texture()
    );
    assert_eq!(
        mpq.get_file_by_name("DBFilesClient\\Map.dbc").await.unwrap(),
        b"WDBC map table"
    );
    assert_eq!(mpq.get_file(4).await.unwrap(), b"RIFF....WAVE");
    assert_eq!(mpq.get_file(6).await.unwrap(), b"new in patch");
}

#[tokio::test]
async fn test_out_of_range_ids() {
    let install = mpq_install();
    let mpq = open(install.path()).await;

    for id in [0, 7, u32::MAX] {
        let err = mpq.get_file(id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingIndexEntry, "id {id}");
    }
    let err = mpq.get_file_by_name("nowhere.txt").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingIndexEntry);
}

#[tokio::test]
async fn test_encrypted_member_is_unsupported() {
    let install = mpq_install();
    let mpq = open(install.path()).await;

    let err = mpq.get_file_by_name("secret.bin").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
    // Other files are still readable afterwards
    assert_eq!(mpq.get_file(2).await.unwrap(), b"WDBC map table");
}

#[tokio::test]
async fn test_build_name_from_config() {
    let install = mpq_install();
    let default = open(install.path()).await;
    assert_eq!(default.build_name(), "unknown");

    let config = StorageConfig::default().with_build_name("1.12.1.5875");
    let named = MpqSource::open(install.path(), Arc::new(ListfileIndex::new()), &config)
        .await
        .unwrap();
    assert_eq!(named.build_name(), "1.12.1.5875");
}

#[tokio::test]
async fn test_missing_data_dir_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = MpqSource::open(dir.path(), Arc::new(ListfileIndex::new()), &StorageConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}
