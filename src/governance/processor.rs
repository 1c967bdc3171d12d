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
    governance::{enrich::enrich, types::abi, GovernanceEventKind},
    ChainEvent, EnricherConfig, EventProcessor,
};

/// Maps a raw log's first topic to an event kind.
///
/// Unrecognized signatures yield `None`: chain upgrades may introduce event
/// types this build does not know about, and those must pass through silently
/// rather than fail the stream.
pub(crate) fn classify(topic0: &B256) -> Option<GovernanceEventKind> {
    match *topic0 {
        t if t == abi::ProposalCreated::SIGNATURE_HASH => {
            Some(GovernanceEventKind::ProposalCreated)
        }
        t if t == abi::ProposalQueued::SIGNATURE_HASH => Some(GovernanceEventKind::ProposalQueued),
        t if t == abi::ProposalExecuted::SIGNATURE_HASH => {
            Some(GovernanceEventKind::ProposalExecuted)
        }
        t if t == abi::ProposalCanceled::SIGNATURE_HASH => {
            Some(GovernanceEventKind::ProposalCanceled)
        }
        t if t == abi::VoteCast::SIGNATURE_HASH => Some(GovernanceEventKind::VoteCast),
        _ => None,
    }
}

/// Live-path converter from raw logs to canonical governance events.
///
/// Per-item tolerant: an unrecognized signature or a failing enrichment drops
/// that one log with a log record, never the batch.
#[derive(Debug)]
pub struct GovernanceProcessor {
    provider: RootProvider<Ethereum>,
    config: EnricherConfig,
    chain: String,
}

impl GovernanceProcessor {
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
impl EventProcessor for GovernanceProcessor {
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

#[cfg(test)]
mod tests {
    use alloy::{
        primitives::{Address, Bytes, LogData, U256},
        providers::mock::Asserter,
        rpc::client::RpcClient,
    };

    use super::*;
    use crate::{governance::GovernanceEvent, EventPayload};

    #[test]
    fn known_signatures_classify() {
        assert_eq!(
            classify(&abi::ProposalCreated::SIGNATURE_HASH),
            Some(GovernanceEventKind::ProposalCreated)
        );
        assert_eq!(classify(&abi::VoteCast::SIGNATURE_HASH), Some(GovernanceEventKind::VoteCast));
    }

    #[test]
    fn unknown_signature_yields_no_kind() {
        let unknown = B256::repeat_byte(0xab);
        assert_eq!(classify(&unknown), None);
    }

    fn processor(config: EnricherConfig) -> GovernanceProcessor {
        let provider = RootProvider::new(RpcClient::mocked(Asserter::new()));
        GovernanceProcessor::new(provider, config, "testnet")
    }

    fn vote_log(block: Option<u64>, weight: u64) -> Log {
        let event = abi::VoteCast {
            voter: Address::repeat_byte(0x07),
            proposalId: U256::from(1u64),
            support: true,
            votes: U256::from(weight),
        };
        Log {
            inner: alloy::primitives::Log {
                address: Address::repeat_byte(0x42),
                data: event.encode_log_data(),
            },
            block_number: block,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn recognized_log_becomes_one_event() {
        let events = processor(EnricherConfig::default()).process(vote_log(Some(12), 500)).await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].block_number, 12);
        match &events[0].data {
            EventPayload::Governance(GovernanceEvent::VoteCast { weight, .. }) => {
                assert_eq!(*weight, U256::from(500u64));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unrecognized_log_produces_no_events_and_no_error() {
        let stray = Log {
            inner: alloy::primitives::Log {
                address: Address::repeat_byte(0x42),
                data: LogData::new_unchecked(vec![B256::repeat_byte(0xaa)], Bytes::new()),
            },
            block_number: Some(3),
            ..Default::default()
        };

        let events = processor(EnricherConfig::default()).process(stray).await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn pending_log_without_block_number_is_dropped() {
        let events = processor(EnricherConfig::default()).process(vote_log(None, 500)).await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn below_threshold_vote_is_suppressed() {
        let config = EnricherConfig {
            vote_weight_threshold: Some(U256::from(1_000u64)),
            ..EnricherConfig::default()
        };
        let events = processor(config).process(vote_log(Some(5), 10)).await;
        assert!(events.is_empty());
    }
}
