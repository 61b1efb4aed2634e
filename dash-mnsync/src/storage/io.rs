//! File helpers shared by the disk store.

use std::path::Path;

use dash_sml::BlockHash;
use dash_sml::consensus::{Decodable, Encodable, deserialize, serialize};
use dash_sml::hashes::Hash;
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Writes `data` to a temporary sibling of `path`, then renames it over `path`, so
/// readers see either the old or the new content.
pub(crate) async fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp_path = path.with_extension("tmp");
    tokio::fs::write(&tmp_path, data).await.map_err(|e| {
        StorageError::WriteFailed(format!("Failed to write {}: {}", tmp_path.display(), e))
    })?;
    tokio::fs::rename(&tmp_path, path).await.map_err(|e| {
        StorageError::WriteFailed(format!("Failed to rename to {}: {}", path.display(), e))
    })
}

/// Reads a file, `None` if it does not exist.
pub(crate) async fn read_if_exists(path: &Path) -> StorageResult<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::ReadFailed(format!("{}: {}", path.display(), e))),
    }
}

pub(crate) fn block_hash_to_hex(block_hash: &BlockHash) -> String {
    hex::encode(block_hash.to_byte_array())
}

pub(crate) fn block_hash_from_hex(s: &str) -> StorageResult<BlockHash> {
    let bytes: [u8; 32] = hex::decode(s)
        .map_err(|e| StorageError::Corruption(format!("Invalid block hash {}: {}", s, e)))?
        .try_into()
        .map_err(|_| StorageError::Corruption(format!("Block hash {} is not 32 bytes", s)))?;
    Ok(BlockHash::from_byte_array(bytes))
}

/// A consensus-encoded value wrapped in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct EncodedRecord {
    pub block_hash: String,
    pub height: Option<u32>,
    pub data: String,
}

impl EncodedRecord {
    pub(crate) fn new<T: Encodable>(block_hash: &BlockHash, height: Option<u32>, value: &T) -> Self {
        EncodedRecord {
            block_hash: block_hash_to_hex(block_hash),
            height,
            data: hex::encode(serialize(value)),
        }
    }

    pub(crate) fn to_json(&self) -> StorageResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| StorageError::Serialization(format!("Failed to serialize record: {}", e)))
    }

    pub(crate) fn from_json(content: &str) -> StorageResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| StorageError::Corruption(format!("Failed to parse record: {}", e)))
    }

    pub(crate) fn decode<T: Decodable>(&self) -> StorageResult<T> {
        let bytes = hex::decode(&self.data)
            .map_err(|e| StorageError::Corruption(format!("Invalid record data: {}", e)))?;
        deserialize(&bytes)
            .map_err(|e| StorageError::Corruption(format!("Failed to decode record: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_atomic_write_replaces_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("index.json");
        atomic_write(&path, b"first").await.unwrap();
        atomic_write(&path, b"second").await.unwrap();
        assert_eq!(read_if_exists(&path).await.unwrap().as_deref(), Some("second"));
        assert!(!path.with_extension("tmp").exists());
        assert_eq!(read_if_exists(&dir.path().join("missing.json")).await.unwrap(), None);
    }

    #[test]
    fn test_corrupt_records_are_reported() {
        assert!(matches!(block_hash_from_hex("abcd"), Err(StorageError::Corruption(_))));
        assert!(matches!(EncodedRecord::from_json("[]"), Err(StorageError::Corruption(_))));

        let record = EncodedRecord {
            block_hash: "00".repeat(32),
            height: Some(1),
            data: "ff".to_string(),
        };
        assert!(matches!(record.decode::<BlockHash>(), Err(StorageError::Corruption(_))));
    }
}
