use alloy::{
    network::Ethereum,
    primitives::B256,
    providers::RootProvider,
    rpc::types::Log,
    sol_types::SolEvent,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    token::{enrich::enrich, types::abi, TokenEventKind},
    ChainEvent, EnricherConfig, EventProcessor,
};

pub(crate) fn classify(topic0: &B256) -> Option<TokenEventKind> {
    match *topic0 {
        t if t == abi::IERC20::Transfer::SIGNATURE_HASH => Some(TokenEventKind::Transfer),
        t if t == abi::IERC20::Approval::SIGNATURE_HASH => Some(TokenEventKind::Approval),
        _ => None,
    }
}

/// Live-path converter from raw logs to canonical token events.
#[derive(Debug)]
pub struct TokenProcessor {
    provider: RootProvider<Ethereum>,
    config: EnricherConfig,
    chain: String,
}

impl TokenProcessor {
    #[must_use]
    pub fn new(
        provider: RootProvider<Ethereum>,
        config: EnricherConfig,
        chain: impl Into<String>,
    ) -> Self {
        Self { provider, config, chain: chain.into() }
    }
}

#[async_trait]
impl EventProcessor for TokenProcessor {
    type Raw = Log;

    async fn process(&self, log: Log) -> Vec<ChainEvent> {
        let Some(block_number) = log.block_number else {
            debug!(chain = %self.chain, "ignoring pending log without a block number");
            return Vec::new();
        };
        let Some(kind) = log.topic0().and_then(classify) else {
            debug!(chain = %self.chain, topic0 = ?log.topic0(), "unrecognized event signature");
            return Vec::new();
        };
        match enrich(&self.provider, block_number, kind, &log, &self.config).await {
            Ok(Some(event)) => vec![event],
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(
                    chain = %self.chain,
                    block = block_number,
                    kind = %kind,
                    error = %err,
                    "enrichment failed, dropping event"
                );
                Vec::new()
            }
        }
    }
}
