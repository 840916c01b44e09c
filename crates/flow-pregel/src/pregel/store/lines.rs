//! Line-oriented record files
//!
//! Each line is `<json key>\t<json value>`. A vertex line carries
//! `[sourcePaths, sinkPaths, edges, pendingDelta]` (the trailing delta is
//! optional when reading); the reserved key `A_p` carries a bare
//! `{edgeId: flow}` map. Unparseable lines are skipped with a warning.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::fs;

use async_trait::async_trait;

use super::VertexStore;
use crate::pregel::error::PregelError;
use crate::pregel::state::{AugmentationMap, RoundInput};
use crate::pregel::vertex::{VertexId, VertexRecord, AUGMENTATION_KEY};

const RECORDS_FILE: &str = "records.txt";

/// One decoded line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLine {
    /// `("A_p", {edgeId: flow})`
    Augmentation(AugmentationMap),
    /// `(vertexId, [S, T, E])` or `(vertexId, [S, T, E, delta])`
    Vertex {
        id: VertexId,
        record: VertexRecord,
        delta: Option<AugmentationMap>,
    },
}

/// Encode a vertex record with its pending delta as one line (no newline)
pub fn encode_record(
    id: &VertexId,
    record: &VertexRecord,
    delta: &AugmentationMap,
) -> Result<String, PregelError> {
    let key = serde_json::to_string(id)
        .map_err(|e| PregelError::store_error(format!("Failed to encode key {id}: {e}")))?;
    let value = serde_json::to_string(&(
        &record.source_paths,
        &record.sink_paths,
        &record.edges,
        delta,
    ))
    .map_err(|e| PregelError::store_error(format!("Failed to encode record {id}: {e}")))?;
    Ok(format!("{key}\t{value}"))
}

fn field<T: DeserializeOwned>(line: usize, name: &str, value: Value) -> Result<T, PregelError> {
    serde_json::from_value(value).map_err(|e| PregelError::malformed(line, format!("{name}: {e}")))
}

/// Decode one line; `line` is the 1-based line number used in errors
pub fn decode_line(line: usize, text: &str) -> Result<StoreLine, PregelError> {
    let (key, value) = text
        .split_once('\t')
        .ok_or_else(|| PregelError::malformed(line, "missing tab separator"))?;
    let key: String = serde_json::from_str(key)
        .map_err(|e| PregelError::malformed(line, format!("key: {e}")))?;
    let value: Value = serde_json::from_str(value)
        .map_err(|e| PregelError::malformed(line, format!("value: {e}")))?;

    if key == AUGMENTATION_KEY {
        return field(line, "augmentation", value).map(StoreLine::Augmentation);
    }

    let mut parts: Vec<Value> = field(line, "record", value)?;
    let delta = match parts.len() {
        3 => None,
        4 => parts
            .pop()
            .map(|delta| field(line, "pending delta", delta))
            .transpose()?,
        n => {
            return Err(PregelError::malformed(
                line,
                format!("expected 3 or 4 record fields, found {n}"),
            ))
        }
    };
    let [source_paths, sink_paths, edges]: [Value; 3] = parts
        .try_into()
        .map_err(|_| PregelError::malformed(line, "record arity"))?;

    Ok(StoreLine::Vertex {
        id: VertexId::new(key),
        record: VertexRecord {
            source_paths: field(line, "source paths", source_paths)?,
            sink_paths: field(line, "sink paths", sink_paths)?,
            edges: field(line, "edges", edges)?,
        },
        delta,
    })
}

/// Round store backed by a line file in a work directory
///
/// The file is rewritten every round through a temporary file and a rename.
#[derive(Debug)]
pub struct LineFileStore {
    work_dir: PathBuf,
    skipped: AtomicUsize,
}

impl LineFileStore {
    /// Create a store writing into `work_dir`
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            skipped: AtomicUsize::new(0),
        }
    }

    /// Path of the current record file
    pub fn records_path(&self) -> PathBuf {
        self.work_dir.join(RECORDS_FILE)
    }

    /// Malformed lines skipped by reads so far
    pub fn skipped_lines(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }

    fn parse(&self, path: &Path, content: &str) -> RoundInput {
        let mut input = RoundInput::default();
        let mut augmentation = None;
        let mut line_delta = None;

        for (index, text) in content.lines().enumerate() {
            if text.trim().is_empty() {
                continue;
            }
            match decode_line(index + 1, text) {
                Ok(StoreLine::Augmentation(map)) => augmentation = Some(map),
                Ok(StoreLine::Vertex { id, record, delta }) => {
                    if line_delta.is_none() {
                        line_delta = delta;
                    }
                    if input.records.insert(id.clone(), record).is_some() {
                        tracing::warn!(vertex = %id, path = %path.display(), "Duplicate record, keeping the last");
                    }
                }
                Err(e) => {
                    self.skipped.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(path = %path.display(), error = %e, "Skipping malformed record");
                }
            }
        }

        input.delta = augmentation.or(line_delta).unwrap_or_default();
        input
    }
}

#[async_trait]
impl VertexStore for LineFileStore {
    async fn write_round(&self, input: &RoundInput) -> Result<(), PregelError> {
        fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|e| PregelError::store_error(format!("Failed to create work dir: {e}")))?;

        let mut content = String::new();
        for (id, record) in &input.records {
            content.push_str(&encode_record(id, record, &input.delta)?);
            content.push('\n');
        }

        let final_path = self.records_path();
        let temp_path = final_path.with_extension("tmp");
        fs::write(&temp_path, content)
            .await
            .map_err(|e| PregelError::store_error(format!("Failed to write records: {e}")))?;
        fs::rename(&temp_path, &final_path)
            .await
            .map_err(|e| PregelError::store_error(format!("Failed to rename records: {e}")))?;
        Ok(())
    }

    async fn read_round(&self) -> Result<RoundInput, PregelError> {
        let path = self.records_path();
        let content = fs::read_to_string(&path).await.map_err(|e| {
            PregelError::store_error(format!("Failed to read {}: {e}", path.display()))
        })?;
        Ok(self.parse(&path, &content))
    }
}
