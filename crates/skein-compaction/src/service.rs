//! The compaction service

use std::sync::Arc;

use tracing::{info, instrument};

use skein_core::{Clock, EventSourceFactory, StateConsumer, StateRepository, SystemClock};

use crate::error::CompactionResult;
use crate::snapshot::{SnapshotDescriptor, SnapshotWriter};

/// Rebuilds a channel's derived state from scratch and snapshots it
///
/// One `compact` call replays the channel into the state repository until
/// every partition has caught up to the start of the call, then hands the
/// repository contents to the snapshot writer. The repository is cleared
/// before the replay and again before the call returns, success or failure,
/// so it never carries partial compaction state past the call.
pub struct CompactionService<R> {
    snapshot_writer: Box<dyn SnapshotWriter>,
    state_repository: Arc<R>,
    source_factory: Box<dyn EventSourceFactory>,
    clock: Box<dyn Clock>,
}

impl<R: StateRepository + 'static> CompactionService<R> {
    pub fn new(
        snapshot_writer: Box<dyn SnapshotWriter>,
        state_repository: Arc<R>,
        source_factory: Box<dyn EventSourceFactory>,
    ) -> Self {
        Self::with_clock(
            snapshot_writer,
            state_repository,
            source_factory,
            Box::new(SystemClock),
        )
    }

    pub fn with_clock(
        snapshot_writer: Box<dyn SnapshotWriter>,
        state_repository: Arc<R>,
        source_factory: Box<dyn EventSourceFactory>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            snapshot_writer,
            state_repository,
            source_factory,
            clock,
        }
    }

    /// Replay the channel to the present and snapshot the result
    #[instrument(skip(self))]
    pub async fn compact(&self, channel_name: &str) -> CompactionResult<SnapshotDescriptor> {
        info!("starting compaction");
        self.state_repository.clear();

        let outcome = self.replay_and_snapshot(channel_name).await;

        self.state_repository.clear();
        outcome
    }

    async fn replay_and_snapshot(
        &self,
        channel_name: &str,
    ) -> CompactionResult<SnapshotDescriptor> {
        let mut source = self.source_factory.build("compaction", channel_name)?;
        source.register(Arc::new(StateConsumer::new(self.state_repository.clone())));

        let position = source.consume_until(self.clock.now_utc()).await?;
        info!(
            entries = self.state_repository.size(),
            "replay caught up, writing snapshot"
        );

        let descriptor = self
            .snapshot_writer
            .write(channel_name, position, self.state_repository.entries())
            .await?;
        Ok(descriptor)
    }
}
