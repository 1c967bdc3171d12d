use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// On-chain event signatures observed by this family.
pub(crate) mod abi {
    use alloy::sol;

    sol! {
        #[derive(Debug)]
        event ProposalCreated(uint256 id, address proposer, uint256 startBlock, uint256 endBlock, string description);

        #[derive(Debug)]
        event ProposalQueued(uint256 id, uint256 eta);

        #[derive(Debug)]
        event ProposalExecuted(uint256 id);

        #[derive(Debug)]
        event ProposalCanceled(uint256 id);

        #[derive(Debug)]
        event VoteCast(address indexed voter, uint256 proposalId, bool support, uint256 votes);
    }
}

/// Closed enumeration of the governance family's event kinds.
///
/// Extending the family means adding a variant here plus its classification
/// and enrichment arms; nothing outside this module switches on these values.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GovernanceEventKind {
    ProposalCreated,
    ProposalQueued,
    ProposalExecuted,
    ProposalCanceled,
    VoteCast,
}

impl std::fmt::Display for GovernanceEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GovernanceEventKind::ProposalCreated => "proposal-created",
            GovernanceEventKind::ProposalQueued => "proposal-queued",
            GovernanceEventKind::ProposalExecuted => "proposal-executed",
            GovernanceEventKind::ProposalCanceled => "proposal-canceled",
            GovernanceEventKind::VoteCast => "vote-cast",
        };
        f.write_str(name)
    }
}

/// Fully-enriched payload of a governance event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum GovernanceEvent {
    ProposalCreated {
        id: U256,
        proposer: Address,
        start_block: u64,
        end_block: u64,
        description: String,
        /// Timestamp of the containing block, read back from the chain
        /// during enrichment.
        created_at: u64,
    },
    ProposalQueued {
        id: U256,
        eta: u64,
    },
    ProposalExecuted {
        id: U256,
    },
    ProposalCanceled {
        id: U256,
    },
    VoteCast {
        voter: Address,
        proposal_id: U256,
        support: bool,
        weight: U256,
    },
}

impl GovernanceEvent {
    #[must_use]
    pub fn kind(&self) -> GovernanceEventKind {
        match self {
            GovernanceEvent::ProposalCreated { .. } => GovernanceEventKind::ProposalCreated,
            GovernanceEvent::ProposalQueued { .. } => GovernanceEventKind::ProposalQueued,
            GovernanceEvent::ProposalExecuted { .. } => GovernanceEventKind::ProposalExecuted,
            GovernanceEvent::ProposalCanceled { .. } => GovernanceEventKind::ProposalCanceled,
            GovernanceEvent::VoteCast { .. } => GovernanceEventKind::VoteCast,
        }
    }

    /// The proposal this event belongs to; every kind in this family is
    /// anchored to one.
    #[must_use]
    pub fn proposal_id(&self) -> U256 {
        match self {
            GovernanceEvent::ProposalCreated { id, .. }
            | GovernanceEvent::ProposalQueued { id, .. }
            | GovernanceEvent::ProposalExecuted { id }
            | GovernanceEvent::ProposalCanceled { id } => *id,
            GovernanceEvent::VoteCast { proposal_id, .. } => *proposal_id,
        }
    }
}
