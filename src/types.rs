use std::time::SystemTime;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{
    governance::{GovernanceEvent, GovernanceEventKind},
    native::{NativeEvent, NativeEventKind},
    token::{TokenEvent, TokenEventKind},
};

/// Adapter family an event originated from.
///
/// Each family owns its own closed [`EventKind`] enumeration, raw item type
/// and set of adapters; the family tag travels with every event and every log
/// record so downstream consumers can dispatch without inspecting payloads.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    /// EVM governance contracts, observed through their event logs.
    Governance,
    /// ERC20 token contracts, observed through their event logs.
    Token,
    /// Native-currency activity, reconstructed from full blocks.
    Native,
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Governance => write!(f, "governance"),
            Network::Token => write!(f, "token"),
            Network::Native => write!(f, "native"),
        }
    }
}

/// Chain-specific payload of a canonical event.
///
/// The sum over all adapter families. Family modules only ever construct
/// their own variant; the combined type exists for the handler-chain boundary,
/// where events from every chain meet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum EventPayload {
    Governance(GovernanceEvent),
    Token(TokenEvent),
    Native(NativeEvent),
}

impl EventPayload {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::Governance(ev) => EventKind::Governance(ev.kind()),
            EventPayload::Token(ev) => EventKind::Token(ev.kind()),
            EventPayload::Native(ev) => EventKind::Native(ev.kind()),
        }
    }
}

/// Discriminant of an [`EventPayload`], usable in exclusion sets.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Governance(GovernanceEventKind),
    Token(TokenEventKind),
    Native(NativeEventKind),
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Governance(kind) => write!(f, "{kind}"),
            EventKind::Token(kind) => write!(f, "{kind}"),
            EventKind::Native(kind) => write!(f, "{kind}"),
        }
    }
}

/// Canonical, chain-agnostic event record delivered to the handler chain.
///
/// Produced by a processor (live path) or a storage fetcher (catch-up path)
/// and immutable afterwards, except for the `chain` and `received` stamps the
/// listener applies at delivery time. Not persisted by this crate; durable
/// storage is a handler's concern.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainEvent {
    pub block_number: u64,
    pub network: Network,
    pub data: EventPayload,
    /// Configured chain identifier, stamped by the listener at delivery.
    pub chain: String,
    /// Addresses that should not be notified of their own action.
    pub exclude_addresses: Vec<Address>,
    /// When present, restricts delivery interest to these addresses.
    pub include_addresses: Option<Vec<Address>>,
    /// Wall-clock receipt time, stamped by the listener at delivery.
    pub received: Option<SystemTime>,
}

impl ChainEvent {
    #[must_use]
    pub fn new(block_number: u64, network: Network, data: EventPayload) -> Self {
        Self {
            block_number,
            network,
            data,
            chain: String::new(),
            exclude_addresses: Vec::new(),
            include_addresses: None,
            received: None,
        }
    }

    /// Marks `addresses` as actors of this event, excluding them from
    /// notification of their own action.
    #[must_use]
    pub fn exclude(mut self, addresses: impl IntoIterator<Item = Address>) -> Self {
        self.exclude_addresses.extend(addresses);
        self
    }

    /// Restricts delivery interest to `addresses`.
    #[must_use]
    pub fn include(mut self, addresses: impl IntoIterator<Item = Address>) -> Self {
        self.include_addresses.get_or_insert_with(Vec::new).extend(addresses);
        self
    }

    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.data.kind()
    }
}

/// Span of blocks potentially missed while offline.
///
/// An empty or inverted range is a legitimate value meaning "nothing to
/// fetch", never an error. When both bounds are present, callers should hold
/// `start_block < end_block`; fetchers return empty otherwise.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectedRange {
    pub start_block: Option<u64>,
    pub end_block: Option<u64>,
    /// Upper bound on returned results; the most recent are kept.
    pub max_results: Option<usize>,
}

impl DisconnectedRange {
    /// Range starting at `start_block` and extending to the current head.
    #[must_use]
    pub fn from_block(start_block: u64) -> Self {
        Self { start_block: Some(start_block), ..Self::default() }
    }
}
