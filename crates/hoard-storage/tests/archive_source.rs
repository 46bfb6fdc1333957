//! The backend-neutral facade

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::*;
use hoard_crypto::{ContentKey, EncodingKey};
use hoard_storage::{
    ArchiveSource, CascSource, ContentStore, ErrorKind, KeyRing, ListfileIndex, LooseFileStore,
    MpqSource, Result, StorageConfig, StorageError,
};
use pretty_assertions::assert_eq;

/// Loose store that sleeps before reading anything but the build tables
#[derive(Debug)]
struct SlowStore {
    inner: Arc<LooseFileStore>,
    slow_key: EncodingKey,
    delay: Duration,
}

#[async_trait]
impl ContentStore for SlowStore {
    async fn fetch(&self, key: &EncodingKey) -> Result<Vec<u8>> {
        if *key == self.slow_key {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.fetch(key).await
    }
}

async fn casc_source() -> (CascFixture, ArchiveSource) {
    let fixture = casc_fixture();
    let casc = CascSource::open(
        fixture.store.clone(),
        &fixture.build_config,
        KeyRing::in_memory(),
        Arc::new(ListfileIndex::new()),
        &StorageConfig::default(),
    )
    .await
    .unwrap();
    (fixture, casc.into())
}

async fn mpq_source(install: &std::path::Path) -> ArchiveSource {
    MpqSource::open(install, Arc::new(ListfileIndex::new()), &StorageConfig::default())
        .await
        .unwrap()
        .into()
}

#[tokio::test]
async fn test_casc_through_facade() {
    let (fixture, source) = casc_source().await;
    source
        .listfile()
        .load_manifest("100;interface/hello.txt\n", None)
        .unwrap();

    assert!(matches!(source, ArchiveSource::Casc(_)));
    assert_eq!(source.build_name(), BUILD_NAME);
    assert_eq!(source.get_file(HELLO_ID).await.unwrap(), b"hello world");
    assert_eq!(
        source.get_file_by_name("interface/hello.txt").await.unwrap(),
        b"hello world"
    );
    assert_eq!(
        source
            .get_encoding_key_for_content_key(&fixture.hello_ckey)
            .unwrap(),
        fixture.hello_ekey
    );
}

#[tokio::test]
async fn test_mpq_through_facade() {
    let install = mpq_install();
    let source = mpq_source(install.path()).await;

    assert!(matches!(source, ArchiveSource::Mpq(_)));
    assert_eq!(source.build_name(), "unknown");
    assert_eq!(source.get_file(3).await.unwrap(), b"patched readme");
    assert_eq!(
        source.get_file_by_name("Sound\\Hello.wav").await.unwrap(),
        b"RIFF....WAVE"
    );
    assert_eq!(source.listfile().len(), 6);
}

#[tokio::test]
async fn test_mpq_has_no_encoding_keys() {
    let install = mpq_install();
    let source = mpq_source(install.path()).await;

    let err = source
        .get_encoding_key_for_content_key(&ContentKey::from_data(b"anything"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
}

#[tokio::test]
async fn test_get_file_with_timeout() {
    let fixture = casc_fixture();
    let store = SlowStore {
        inner: fixture.store.clone(),
        slow_key: fixture.hello_ekey,
        delay: Duration::from_secs(5),
    };
    let casc = CascSource::open(
        Arc::new(store),
        &fixture.build_config,
        KeyRing::in_memory(),
        Arc::new(ListfileIndex::new()),
        &StorageConfig::default(),
    )
    .await
    .unwrap();
    let source = ArchiveSource::from(casc);

    let err = source
        .get_file_with_timeout(HELLO_ID, Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Timeout(_)));
    assert!(err.is_recoverable());

    // Only the slow key is delayed
    assert_eq!(
        source
            .get_file_with_timeout(MULTI_ID, Duration::from_secs(5))
            .await
            .unwrap(),
        b"first chunk second chunk"
    );
}
