//! One entry point over both archive backends

use std::sync::Arc;
use std::time::Duration;

use hoard_crypto::{ContentKey, EncodingKey};

use crate::casc::CascSource;
use crate::listfile::ListfileIndex;
use crate::mpq::MpqSource;
use crate::{Result, StorageError};

/// An opened CASC build or MPQ installation
#[derive(Debug, Clone)]
pub enum ArchiveSource {
    /// CASC build
    Casc(CascSource),
    /// MPQ installation
    Mpq(MpqSource),
}

impl ArchiveSource {
    /// Contents of a FileDataID
    pub async fn get_file(&self, file_data_id: u32) -> Result<Vec<u8>> {
        match self {
            Self::Casc(casc) => casc.get_file(file_data_id).await,
            Self::Mpq(mpq) => mpq.get_file(file_data_id).await,
        }
    }

    /// Contents of a named file
    pub async fn get_file_by_name(&self, name: &str) -> Result<Vec<u8>> {
        match self {
            Self::Casc(casc) => casc.get_file_by_name(name).await,
            Self::Mpq(mpq) => mpq.get_file_by_name(name).await,
        }
    }

    /// [`ArchiveSource::get_file`] bounded by `timeout`
    pub async fn get_file_with_timeout(
        &self,
        file_data_id: u32,
        timeout: Duration,
    ) -> Result<Vec<u8>> {
        tokio::time::timeout(timeout, self.get_file(file_data_id))
            .await
            .map_err(|_| StorageError::Timeout(timeout))?
    }

    /// Encoding key for a content key; MPQ installations have none
    pub fn get_encoding_key_for_content_key(
        &self,
        content_key: &ContentKey,
    ) -> Result<EncodingKey> {
        match self {
            Self::Casc(casc) => casc.get_encoding_key_for_content_key(content_key),
            Self::Mpq(_) => Err(StorageError::UnsupportedFeature(
                "MPQ archives have no encoding keys".to_string(),
            )),
        }
    }

    /// Build name
    pub fn build_name(&self) -> &str {
        match self {
            Self::Casc(casc) => casc.build_name(),
            Self::Mpq(mpq) => mpq.build_name(),
        }
    }

    /// Listfile shared with the backend
    pub fn listfile(&self) -> &Arc<ListfileIndex> {
        match self {
            Self::Casc(casc) => casc.listfile(),
            Self::Mpq(mpq) => mpq.listfile(),
        }
    }
}

impl From<CascSource> for ArchiveSource {
    fn from(source: CascSource) -> Self {
        Self::Casc(source)
    }
}

impl From<MpqSource> for ArchiveSource {
    fn from(source: MpqSource) -> Self {
        Self::Mpq(source)
    }
}
