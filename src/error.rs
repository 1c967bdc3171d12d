use std::sync::Arc;

use alloy::{
    primitives::Address,
    sol_types,
    transports::{RpcError, TransportErrorKind},
};
use thiserror::Error;

/// Errors surfaced by the ingestion pipeline.
///
/// Connection exhaustion ([`RelayError::Connection`]) is the only fatal
/// variant: it aborts listener construction for that chain. Everything else is
/// scoped to a catch-up attempt, a single raw item, or a single handler
/// invocation, and the component that observes it decides whether to log and
/// continue (see the listener and processor docs).
#[derive(Error, Debug, Clone)]
pub enum RelayError {
    /// All connection attempts against an endpoint were exhausted.
    #[error("[{chain}] failed to connect to {url}: {source}")]
    Connection {
        chain: String,
        url: String,
        #[source]
        source: Box<RelayError>,
    },

    /// The underlying RPC transport returned an error.
    #[error("RPC error: {0}")]
    Rpc(Arc<RpcError<TransportErrorKind>>),

    /// A read-back contract call made during enrichment failed.
    #[error("contract call failed: {0}")]
    Contract(Arc<alloy::contract::Error>),

    /// No contract code is deployed at the configured address.
    ///
    /// Raised by the connection liveness check; a handshake that succeeds
    /// against a node without the contract counts as a failed attempt.
    #[error("no contract deployed at {0}")]
    ContractMissing(Address),

    /// A block expected to exist could not be retrieved.
    #[error("block {0} not found")]
    BlockNotFound(u64),

    /// A raw log could not be decoded against the expected event ABI.
    #[error("failed to decode {0} log: {1}")]
    Decode(&'static str, Arc<sol_types::Error>),

    /// The live feed could not be established or was torn down by the remote.
    #[error("subscription closed")]
    SubscriptionClosed,

    /// An event handler reported an unrecoverable failure for one event.
    #[error("handler failed: {0}")]
    Handler(Arc<dyn std::error::Error + Send + Sync>),
}

impl RelayError {
    /// Wraps an arbitrary consumer-side error for return from an
    /// [`EventHandler`](crate::EventHandler).
    pub fn handler<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RelayError::Handler(Arc::new(err))
    }
}

impl From<RpcError<TransportErrorKind>> for RelayError {
    fn from(error: RpcError<TransportErrorKind>) -> Self {
        RelayError::Rpc(Arc::new(error))
    }
}

impl From<alloy::contract::Error> for RelayError {
    fn from(error: alloy::contract::Error) -> Self {
        RelayError::Contract(Arc::new(error))
    }
}
