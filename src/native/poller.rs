use alloy::{
    network::Ethereum,
    providers::{Provider, RootProvider},
    rpc::types::Block,
};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{DisconnectedRange, EventPoller, RelayError};

/// Fetches raw blocks over a range, in fixed-size batches.
///
/// Used for reconnect catch-up and for archival bulk replay on the
/// block-oriented family. Retrieval only: the blocks still go through the
/// family's processor afterwards. A block missing from a historical range
/// aborts the poll; catch-up is all-or-nothing per range.
#[derive(Debug)]
pub struct NativePoller {
    provider: RootProvider<Ethereum>,
    batch_size: u64,
    chain: String,
}

impl NativePoller {
    #[must_use]
    pub fn new(provider: RootProvider<Ethereum>, batch_size: u64, chain: impl Into<String>) -> Self {
        Self { provider, batch_size: batch_size.max(1), chain: chain.into() }
    }

    /// Resolves the effective `[start, end]` bounds, or `None` when the range
    /// is empty. Absent bounds default to `[0, head]`; `max_results` keeps
    /// only the most recent blocks of an oversized range.
    async fn resolve(&self, range: DisconnectedRange) -> Result<Option<(u64, u64)>, RelayError> {
        let head = self.provider.get_block_number().await?;
        let mut start = range.start_block.unwrap_or(0);
        if start >= head {
            info!(
                chain = %self.chain,
                start,
                head,
                "start block at or beyond current head, nothing to poll"
            );
            return Ok(None);
        }
        let end = range.end_block.unwrap_or(head).min(head);
        if start >= end {
            info!(chain = %self.chain, start, end, "empty block range, nothing to poll");
            return Ok(None);
        }
        if let Some(max) = range.max_results {
            let max = max as u64;
            if end - start + 1 > max {
                let clamped = end - max + 1;
                info!(
                    chain = %self.chain,
                    start,
                    clamped,
                    "range larger than max results, polling most recent blocks only"
                );
                start = clamped;
            }
        }
        Ok(Some((start, end)))
    }

    async fn fetch_block(&self, number: u64) -> Result<Block, RelayError> {
        self.provider
            .get_block_by_number(number.into())
            .full()
            .await?
            .ok_or(RelayError::BlockNotFound(number))
    }
}

#[async_trait]
impl EventPoller for NativePoller {
    type Raw = Block;

    async fn poll(&self, range: DisconnectedRange) -> Result<Vec<Block>, RelayError> {
        let Some((start, end)) = self.resolve(range).await? else {
            return Ok(Vec::new());
        };
        info!(chain = %self.chain, start, end, "polling block range");

        let mut blocks = Vec::with_capacity(usize::try_from(end - start + 1).unwrap_or_default());
        let mut batch_start = start;
        while batch_start <= end {
            let batch_end = end.min(batch_start + self.batch_size - 1);
            for number in batch_start..=batch_end {
                blocks.push(self.fetch_block(number).await?);
            }
            debug!(chain = %self.chain, batch_start, batch_end, "fetched block batch");
            batch_start = batch_end + 1;
        }
        Ok(blocks)
    }

    async fn poll_each(
        &self,
        range: DisconnectedRange,
        sink: mpsc::Sender<Block>,
    ) -> Result<(), RelayError> {
        let Some((start, end)) = self.resolve(range).await? else {
            return Ok(());
        };
        info!(chain = %self.chain, start, end, "streaming block range");

        for number in start..=end {
            let block = self.fetch_block(number).await?;
            if sink.send(block).await.is_err() {
                debug!(chain = %self.chain, number, "block sink dropped, stopping stream");
                return Ok(());
            }
        }
        Ok(())
    }
}
