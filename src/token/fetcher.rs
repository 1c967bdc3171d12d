use alloy::{
    network::Ethereum,
    primitives::Address,
    providers::{Provider, RootProvider},
    rpc::types::Filter,
};
use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::{
    token::{enrich::enrich, processor::classify},
    ChainEvent, DisconnectedRange, EnricherConfig, EventPayload, RelayError, StorageFetcher,
};

/// Reconstructs canonical token events from historical logs.
///
/// Same failure policy as the other range fetchers: one bad log aborts the
/// whole fetch and the caller decides whether to proceed without the range.
#[derive(Debug)]
pub struct TokenFetcher {
    provider: RootProvider<Ethereum>,
    tokens: Vec<Address>,
    config: EnricherConfig,
    chain: String,
}

impl TokenFetcher {
    #[must_use]
    pub fn new(
        provider: RootProvider<Ethereum>,
        tokens: Vec<Address>,
        config: EnricherConfig,
        chain: impl Into<String>,
    ) -> Self {
        Self { provider, tokens, config, chain: chain.into() }
    }
}

#[async_trait]
impl StorageFetcher for TokenFetcher {
    async fn fetch(
        &self,
        range: Option<DisconnectedRange>,
    ) -> Result<Vec<ChainEvent>, RelayError> {
        let head = self.provider.get_block_number().await?;
        let range = range.unwrap_or_default();
        let start = range.start_block.unwrap_or(0);
        if start >= head {
            info!(
                chain = %self.chain,
                start,
                head,
                "start block at or beyond current head, nothing to fetch"
            );
            return Ok(Vec::new());
        }
        let end = range.end_block.unwrap_or(head);
        if start >= end {
            info!(chain = %self.chain, start, end, "empty block range, nothing to fetch");
            return Ok(Vec::new());
        }

        info!(chain = %self.chain, start, end, "fetching historical token events");

        let filter =
            Filter::new().address(self.tokens.clone()).from_block(start).to_block(end);
        let logs = self.provider.get_logs(&filter).await?;

        let mut events = Vec::new();
        for log in logs {
            let Some(block_number) = log.block_number else {
                continue;
            };
            let Some(kind) = log.topic0().and_then(classify) else {
                debug!(chain = %self.chain, topic0 = ?log.topic0(), "unrecognized event signature");
                continue;
            };
            if let Some(event) =
                enrich(&self.provider, block_number, kind, &log, &self.config).await?
            {
                events.push(event);
            }
        }

        events.sort_by_key(|event| event.block_number);
        if let Some(max) = range.max_results {
            if events.len() > max {
                events.drain(..events.len() - max);
            }
        }
        Ok(events)
    }

    /// Events a single address participated in, across the whole range.
    async fn fetch_one(&self, id: &str) -> Result<Vec<ChainEvent>, RelayError> {
        let Ok(wanted) = id.parse::<Address>() else {
            error!(chain = %self.chain, id, "not a valid address");
            return Ok(Vec::new());
        };
        let events = self.fetch(None).await?;
        Ok(events
            .into_iter()
            .filter(|event| match &event.data {
                EventPayload::Token(data) => data.participants().contains(&wanted),
                _ => false,
            })
            .collect())
    }
}
