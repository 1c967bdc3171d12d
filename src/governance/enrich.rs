//! Maps a classified raw log into a fully-typed canonical event.
//!
//! Enrichment may read back against the chain to fill payload fields the log
//! itself does not carry. Returning `Ok(None)` means "valid classification,
//! event intentionally suppressed" (e.g. below a configured threshold) and is
//! not an error.

use std::sync::Arc;

use alloy::{
    network::Ethereum,
    providers::{Provider, RootProvider},
    rpc::types::Log,
    sol_types::SolEvent,
};
use tracing::debug;

use crate::{
    governance::types::{abi, GovernanceEvent, GovernanceEventKind},
    ChainEvent, EnricherConfig, EventPayload, Network, RelayError,
};

fn decode_error(event: &'static str) -> impl FnOnce(alloy::sol_types::Error) -> RelayError {
    move |err| RelayError::Decode(event, Arc::new(err))
}

pub async fn enrich(
    provider: &RootProvider<Ethereum>,
    block_number: u64,
    kind: GovernanceEventKind,
    log: &Log,
    config: &EnricherConfig,
) -> Result<Option<ChainEvent>, RelayError> {
    let event = match kind {
        GovernanceEventKind::ProposalCreated => {
            let data = abi::ProposalCreated::decode_log(&log.inner)
                .map_err(decode_error("ProposalCreated"))?
                .data;
            let block = provider
                .get_block_by_number(block_number.into())
                .await?
                .ok_or(RelayError::BlockNotFound(block_number))?;
            let payload = GovernanceEvent::ProposalCreated {
                id: data.id,
                proposer: data.proposer,
                start_block: data.startBlock.saturating_to(),
                end_block: data.endBlock.saturating_to(),
                description: data.description,
                created_at: block.header.timestamp,
            };
            ChainEvent::new(block_number, Network::Governance, EventPayload::Governance(payload))
                .exclude([data.proposer])
        }
        GovernanceEventKind::ProposalQueued => {
            let data = abi::ProposalQueued::decode_log(&log.inner)
                .map_err(decode_error("ProposalQueued"))?
                .data;
            let payload =
                GovernanceEvent::ProposalQueued { id: data.id, eta: data.eta.saturating_to() };
            ChainEvent::new(block_number, Network::Governance, EventPayload::Governance(payload))
        }
        GovernanceEventKind::ProposalExecuted => {
            let data = abi::ProposalExecuted::decode_log(&log.inner)
                .map_err(decode_error("ProposalExecuted"))?
                .data;
            let payload = GovernanceEvent::ProposalExecuted { id: data.id };
            ChainEvent::new(block_number, Network::Governance, EventPayload::Governance(payload))
        }
        GovernanceEventKind::ProposalCanceled => {
            let data = abi::ProposalCanceled::decode_log(&log.inner)
                .map_err(decode_error("ProposalCanceled"))?
                .data;
            let payload = GovernanceEvent::ProposalCanceled { id: data.id };
            ChainEvent::new(block_number, Network::Governance, EventPayload::Governance(payload))
        }
        GovernanceEventKind::VoteCast => {
            let data =
                abi::VoteCast::decode_log(&log.inner).map_err(decode_error("VoteCast"))?.data;
            if let Some(threshold) = config.vote_weight_threshold {
                if data.votes < threshold {
                    debug!(
                        voter = %data.voter,
                        weight = %data.votes,
                        threshold = %threshold,
                        "vote below weight threshold, suppressed"
                    );
                    return Ok(None);
                }
            }
            let payload = GovernanceEvent::VoteCast {
                voter: data.voter,
                proposal_id: data.proposalId,
                support: data.support,
                weight: data.votes,
            };
            ChainEvent::new(block_number, Network::Governance, EventPayload::Governance(payload))
                .exclude([data.voter])
        }
    };
    Ok(Some(event))
}
