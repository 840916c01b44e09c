//! File-based checkpointer
//!
//! One JSON document per checkpoint, optionally zstd-compressed:
//!
//! ```text
//! checkpoints/
//! └── {run_id}/
//!     ├── round_00010.json[.zst]
//!     └── round_00020.json[.zst]
//! ```

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{Checkpoint, Checkpointer};
use crate::pregel::error::PregelError;

const PREFIX: &str = "round_";

fn io_error(action: &'static str) -> impl Fn(std::io::Error) -> PregelError {
    move |e| PregelError::checkpoint_error(format!("{action}: {e}"))
}

/// Checkpointer storing one file per checkpointed round
///
/// Writes go to a temporary file that is renamed into place.
#[derive(Debug)]
pub struct FileCheckpointer {
    run_path: PathBuf,
    compression: bool,
}

impl FileCheckpointer {
    /// Create a checkpointer under `base_path/run_id`
    pub fn new(base_path: impl Into<PathBuf>, run_id: impl AsRef<str>, compression: bool) -> Self {
        Self {
            run_path: base_path.into().join(run_id.as_ref()),
            compression,
        }
    }

    /// Directory holding this run's checkpoints
    pub fn run_path(&self) -> &Path {
        &self.run_path
    }

    fn checkpoint_path(&self, superstep: usize) -> PathBuf {
        let extension = if self.compression { "json.zst" } else { "json" };
        self.run_path
            .join(format!("{PREFIX}{superstep:05}.{extension}"))
    }

    fn temp_path(&self, superstep: usize) -> PathBuf {
        self.run_path.join(format!("{PREFIX}{superstep:05}.tmp"))
    }

    fn compress(data: &[u8]) -> Result<Vec<u8>, PregelError> {
        let mut encoder =
            zstd::stream::Encoder::new(Vec::new(), 3).map_err(io_error("Compression init failed"))?;
        encoder
            .write_all(data)
            .map_err(io_error("Compression write failed"))?;
        encoder.finish().map_err(io_error("Compression finish failed"))
    }

    fn decompress(data: &[u8]) -> Result<Vec<u8>, PregelError> {
        zstd::stream::decode_all(data).map_err(io_error("Decompression failed"))
    }

    /// Superstep encoded in a finished checkpoint's file name
    fn parse_superstep(path: &Path) -> Option<usize> {
        let filename = path.file_name()?.to_str()?;
        let (number, extension) = filename.strip_prefix(PREFIX)?.split_once('.')?;
        if extension == "tmp" {
            return None;
        }
        number.parse().ok()
    }
}

#[async_trait]
impl Checkpointer for FileCheckpointer {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), PregelError> {
        fs::create_dir_all(&self.run_path)
            .await
            .map_err(io_error("Failed to create directory"))?;

        let json = serde_json::to_vec(checkpoint)
            .map_err(|e| PregelError::checkpoint_error(format!("Serialization failed: {e}")))?;
        let data = if self.compression {
            Self::compress(&json)?
        } else {
            json
        };

        let temp_path = self.temp_path(checkpoint.superstep);
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(io_error("Failed to create temp file"))?;
        file.write_all(&data)
            .await
            .map_err(io_error("Failed to write data"))?;
        file.sync_all().await.map_err(io_error("Failed to sync file"))?;

        fs::rename(&temp_path, self.checkpoint_path(checkpoint.superstep))
            .await
            .map_err(io_error("Failed to rename file"))?;

        tracing::debug!(superstep = checkpoint.superstep, bytes = data.len(), "Checkpoint written");
        Ok(())
    }

    async fn load(&self, superstep: usize) -> Result<Option<Checkpoint>, PregelError> {
        let path = self.checkpoint_path(superstep);
        if !fs::try_exists(&path).await.map_err(io_error("Failed to stat file"))? {
            return Ok(None);
        }

        let data = fs::read(&path).await.map_err(io_error("Failed to read file"))?;
        let json = if self.compression {
            Self::decompress(&data)?
        } else {
            data
        };

        serde_json::from_slice(&json)
            .map(Some)
            .map_err(|e| PregelError::checkpoint_error(format!("Deserialization failed: {e}")))
    }

    async fn latest(&self) -> Result<Option<Checkpoint>, PregelError> {
        match self.list().await?.last() {
            Some(&superstep) => self.load(superstep).await,
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<usize>, PregelError> {
        if !fs::try_exists(&self.run_path)
            .await
            .map_err(io_error("Failed to stat directory"))?
        {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&self.run_path)
            .await
            .map_err(io_error("Failed to read directory"))?;
        let mut supersteps = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(io_error("Failed to read entry"))?
        {
            if let Some(superstep) = Self::parse_superstep(&entry.path()) {
                supersteps.push(superstep);
            }
        }

        supersteps.sort_unstable();
        supersteps.dedup();
        Ok(supersteps)
    }

    async fn delete(&self, superstep: usize) -> Result<(), PregelError> {
        let path = self.checkpoint_path(superstep);
        if fs::try_exists(&path).await.map_err(io_error("Failed to stat file"))? {
            fs::remove_file(&path)
                .await
                .map_err(io_error("Failed to delete file"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{Edge, EdgeId, Path as FlowPath};
    use crate::pregel::{AugmentationMap, ConvergenceState, RoundInput, VertexId, VertexRecord};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn checkpoint(superstep: usize) -> Checkpoint {
        let mut records = BTreeMap::new();
        records.insert(
            VertexId::source(),
            VertexRecord::with_edges(vec![Edge::new("s", "a", 10)]),
        );
        records.insert(
            VertexId::new("a"),
            VertexRecord {
                source_paths: vec![FlowPath::single(Edge::new("s", "a", 10))],
                sink_paths: vec![FlowPath::single(Edge::new("a", "t", 4))],
                edges: vec![Edge::new("a", "t", 4)],
            },
        );
        let augmentation: AugmentationMap = [(EdgeId::between("s", "a"), 4)].into_iter().collect();
        Checkpoint::new(
            "test-run",
            superstep,
            RoundInput {
                records,
                delta: augmentation.clone(),
            },
            augmentation,
            ConvergenceState::new(5),
        )
    }

    #[tokio::test]
    async fn test_file_checkpointer_save_load() {
        let temp_dir = tempdir().unwrap();
        let checkpointer = FileCheckpointer::new(temp_dir.path(), "test-run", false);

        let saved = checkpoint(5);
        checkpointer.save(&saved).await.unwrap();
        let loaded = checkpointer.load(5).await.unwrap().unwrap();

        assert_eq!(loaded, saved);
        assert_eq!(loaded.input.vertex_count(), 2);
    }

    #[tokio::test]
    async fn test_file_checkpointer_with_compression() {
        let temp_dir = tempdir().unwrap();
        let checkpointer = FileCheckpointer::new(temp_dir.path(), "compressed", true);

        checkpointer.save(&checkpoint(10)).await.unwrap();
        assert!(temp_dir.path().join("compressed/round_00010.json.zst").exists());

        let loaded = checkpointer.load(10).await.unwrap().unwrap();
        assert_eq!(loaded.superstep, 10);
        assert_eq!(loaded.input.delta.get(&EdgeId::between("s", "a")), 4);
    }

    #[tokio::test]
    async fn test_file_checkpointer_load_nonexistent() {
        let temp_dir = tempdir().unwrap();
        let checkpointer = FileCheckpointer::new(temp_dir.path(), "test-run", false);
        assert!(checkpointer.load(999).await.unwrap().is_none());
        assert!(checkpointer.latest().await.unwrap().is_none());
        assert!(checkpointer.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_checkpointer_list_latest_prune() {
        let temp_dir = tempdir().unwrap();
        let checkpointer = FileCheckpointer::new(temp_dir.path(), "test-run", false);

        for superstep in [5, 1, 10, 3] {
            checkpointer.save(&checkpoint(superstep)).await.unwrap();
        }
        assert_eq!(checkpointer.list().await.unwrap(), vec![1, 3, 5, 10]);
        assert_eq!(checkpointer.latest().await.unwrap().unwrap().superstep, 10);

        assert_eq!(checkpointer.prune(2).await.unwrap(), 2);
        assert_eq!(checkpointer.list().await.unwrap(), vec![5, 10]);

        checkpointer.delete(10).await.unwrap();
        assert_eq!(checkpointer.latest().await.unwrap().unwrap().superstep, 5);
    }

    #[tokio::test]
    async fn test_file_checkpointer_atomic_write() {
        let temp_dir = tempdir().unwrap();
        let checkpointer = FileCheckpointer::new(temp_dir.path(), "test-run", false);

        checkpointer.save(&checkpoint(7)).await.unwrap();

        assert!(!temp_dir.path().join("test-run/round_00007.tmp").exists());
        assert!(temp_dir.path().join("test-run/round_00007.json").exists());
    }

    #[test]
    fn test_parse_superstep() {
        assert_eq!(
            FileCheckpointer::parse_superstep(Path::new("round_00005.json")),
            Some(5)
        );
        assert_eq!(
            FileCheckpointer::parse_superstep(Path::new("round_00123.json.zst")),
            Some(123)
        );
        assert_eq!(FileCheckpointer::parse_superstep(Path::new("round_00007.tmp")), None);
        assert_eq!(FileCheckpointer::parse_superstep(Path::new("other.json")), None);
    }
}
