//! Round hand-off between supersteps
//!
//! The orchestrator writes the record set produced by a round through a
//! [`VertexStore`] and reads it back as the next round's input. The map and
//! reduce programs never see the store, so the mechanism can change without
//! touching them.
//!
//! - [`MemoryStore`]: keeps the latest round in memory (embedded runs)
//! - [`LineFileStore`]: one `<json key>\t<json value>` line per record in a
//!   work directory (staged runs)

mod lines;

pub use lines::{decode_line, encode_record, LineFileStore, StoreLine};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::error::PregelError;
use super::state::RoundInput;

/// Storage for the record set handed from one round to the next
#[async_trait]
pub trait VertexStore: Send + Sync {
    /// Replace the stored round with `input`
    async fn write_round(&self, input: &RoundInput) -> Result<(), PregelError>;

    /// Read back the stored round
    async fn read_round(&self) -> Result<RoundInput, PregelError>;
}

/// In-memory round store
#[derive(Debug, Default)]
pub struct MemoryStore {
    current: RwLock<Option<RoundInput>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VertexStore for MemoryStore {
    async fn write_round(&self, input: &RoundInput) -> Result<(), PregelError> {
        *self.current.write().await = Some(input.clone());
        Ok(())
    }

    async fn read_round(&self) -> Result<RoundInput, PregelError> {
        self.current
            .read()
            .await
            .clone()
            .ok_or_else(|| PregelError::store_error("No round has been written"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{Edge, EdgeId};
    use crate::pregel::{VertexId, VertexRecord};
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.read_round().await,
            Err(PregelError::StoreError(_))
        ));

        let mut records = BTreeMap::new();
        records.insert(
            VertexId::source(),
            VertexRecord::with_edges(vec![Edge::new("s", "t", 7)]),
        );
        let input = RoundInput {
            records,
            delta: [(EdgeId::between("s", "t"), 7)].into_iter().collect(),
        };

        store.write_round(&input).await.unwrap();
        assert_eq!(store.read_round().await.unwrap(), input);

        store.write_round(&RoundInput::default()).await.unwrap();
        assert_eq!(store.read_round().await.unwrap().vertex_count(), 0);
    }
}
