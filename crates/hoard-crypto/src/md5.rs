//! Content keys, encoding keys and file data IDs

use binrw::{BinRead, BinWrite};
use md5::{Digest, Md5};
use std::fmt;

macro_rules! md5_key {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; 16]);

        impl $name {
            /// Wrap raw bytes
            pub const fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(bytes)
            }

            /// MD5 of `data`
            pub fn from_data(data: &[u8]) -> Self {
                let digest = Md5::digest(data);
                let mut bytes = [0u8; 16];
                bytes.copy_from_slice(&digest);
                Self(bytes)
            }

            /// Parse 32 hex characters
            pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
                let mut bytes = [0u8; 16];
                hex::decode_to_slice(hex.trim(), &mut bytes)?;
                Ok(Self(bytes))
            }

            /// Build from a slice that must be exactly 16 bytes long
            pub fn from_slice(bytes: &[u8]) -> Option<Self> {
                <[u8; 16]>::try_from(bytes).ok().map(Self)
            }

            /// Raw bytes
            pub const fn as_bytes(&self) -> &[u8; 16] {
                &self.0
            }

            /// Lower-case hex
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }
    };
}

md5_key!(
    /// Hash of a file's decoded content
    ContentKey
);

md5_key!(
    /// Hash of a file's encoded (BLTE) representation
    EncodingKey
);

/// Stable per-build numeric file identifier
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[brw(little)]
pub struct FileDataId(pub u32);

impl FileDataId {
    /// Create a new `FileDataId`
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw value
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FileDataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FileDataId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<FileDataId> for u32 {
    fn from(fdid: FileDataId) -> Self {
        fdid.0
    }
}
