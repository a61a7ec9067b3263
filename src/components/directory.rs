//! In-Memory Stream Directory
//!
//! A [`StreamDirectory`] backed by a fixed list of streams. The demo binary and the tests use it
//! in place of a real patient registry.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;

use crate::{api::controller::StreamDirectory, model::stream::StreamMetadata};

#[derive(Clone, Debug, Default)]
pub struct InMemoryDirectory {
    streams: HashMap<String, StreamMetadata>,
}

impl InMemoryDirectory {
    pub fn new(streams: impl IntoIterator<Item = StreamMetadata>) -> Self {
        Self {
            streams: streams.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }

    /// Registers or replaces a stream.
    pub fn insert(&mut self, stream: StreamMetadata) {
        self.streams.insert(stream.id.clone(), stream);
    }
}

#[async_trait]
impl StreamDirectory for InMemoryDirectory {
    async fn get_stream_metadata(
        &self,
        patient_id: &str,
        stream_ids: &[String],
    ) -> Result<Vec<StreamMetadata>> {
        debug!("resolving {} streams for patient {}", stream_ids.len(), patient_id);
        stream_ids
            .iter()
            .map(|id| {
                let stream = self
                    .streams
                    .get(id)
                    .ok_or(anyhow!("unknown stream {}", id))?;
                if stream.patient_id != patient_id {
                    return Err(anyhow!("stream {} does not belong to patient {}", id, patient_id));
                }
                Ok(stream.clone())
            })
            .collect()
    }
}
