//! Capability contracts implemented once per adapter family.
//!
//! The listener is written purely against these traits; it never branches on
//! chain identity. A new chain family means a new set of implementations, not
//! a change to the ingestion core.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;

use crate::{ChainEvent, DisconnectedRange, RelayError};

/// One item of a live feed.
#[derive(Clone, Debug)]
pub enum FeedMessage<R> {
    /// A raw chain item (log, block) to be run through the processor.
    Item(R),
    /// The underlying session was re-established after a drop.
    ///
    /// The listener re-runs missed-block catch-up when it observes this;
    /// because the signal travels in-band with the items, the re-run can never
    /// overlap live delivery for the same chain.
    Reconnected,
}

/// Live feed of raw chain items.
///
/// Implementations wrap a chain-specific subscription (contract log feed,
/// block-header stream) and pump it into the returned channel. They own the
/// underlying session: [`unsubscribe`](EventSubscriber::unsubscribe) must
/// detach everything and be safe to call when not subscribed.
#[async_trait]
pub trait EventSubscriber: Send {
    type Raw: Send + 'static;

    /// Opens the feed. May await a one-time readiness signal (e.g. a chain id
    /// check) before delivery starts, so items are never classified against
    /// the wrong schema.
    async fn subscribe(&mut self) -> Result<mpsc::Receiver<FeedMessage<Self::Raw>>, RelayError>;

    /// Detaches all underlying listeners. Idempotent.
    async fn unsubscribe(&mut self);
}

/// Converts one raw item into zero or more canonical events.
///
/// Per-item tolerant by contract: an unrecognized or failing item is logged
/// and dropped, never the whole batch. Contrast with
/// [`StorageFetcher::fetch`], which aborts the whole range.
#[async_trait]
pub trait EventProcessor: Send + Sync {
    type Raw: Send + 'static;

    async fn process(&self, raw: Self::Raw) -> Vec<ChainEvent>;
}

/// Reconstructs canonical events from historical chain state.
#[async_trait]
pub trait StorageFetcher: Send + Sync {
    /// Fetches events for `range`, sorted ascending by block number.
    ///
    /// Absent bounds default to `[0, current head]`. An empty or inverted
    /// range returns `Ok(vec![])`. A single enrichment failure aborts the
    /// whole fetch; callers treat the error as "catch-up failed, proceed
    /// without it".
    async fn fetch(&self, range: Option<DisconnectedRange>)
        -> Result<Vec<ChainEvent>, RelayError>;

    /// Events for a single entity, by its chain-native identifier.
    ///
    /// Default adapters fetch the whole range and filter; callers needing
    /// efficiency must supply a narrower range through their own fetcher.
    async fn fetch_one(&self, id: &str) -> Result<Vec<ChainEvent>, RelayError>;
}

/// Fetches raw blocks over a range, for chains without per-event replay.
///
/// The returned blocks still need to be run through the family's
/// [`EventProcessor`]; the poller only does retrieval, in fixed-size batches.
#[async_trait]
pub trait EventPoller: Send + Sync {
    type Raw: Send + 'static;

    /// Fetches and buffers every block in `range`.
    async fn poll(&self, range: DisconnectedRange) -> Result<Vec<Self::Raw>, RelayError>;

    /// Streams each block into `sink` as it arrives instead of buffering the
    /// whole range. Used for archival bulk replay.
    async fn poll_each(
        &self,
        range: DisconnectedRange,
        sink: mpsc::Sender<Self::Raw>,
    ) -> Result<(), RelayError>;
}

/// Consumer callback invoked for every delivered event.
///
/// Handlers form an ordered pipeline: each receives the previous handler's
/// output as `prev` and its own return value flows to the next (a persistence
/// handler's stored row becomes visible to a downstream notifier). Returning
/// `Err` aborts the remaining handlers for this one event only.
#[async_trait]
pub trait EventHandler<Out>: Send + Sync {
    async fn handle(
        &self,
        event: &ChainEvent,
        prev: Option<Out>,
    ) -> Result<Option<Out>, RelayError>;
}

/// Externally supplied source of the durable per-chain watermark.
///
/// Backed by the consumer's own store of "last event block seen". Expected
/// absence of data is `Ok(None)`, not an error; a returned error makes the
/// listener skip that catch-up attempt entirely.
#[async_trait]
pub trait ReconnectRangeProvider: Send + Sync {
    async fn discover(&self, chain: &str) -> Result<Option<DisconnectedRange>, RelayError>;
}

/// Handler that logs each event and passes the accumulator through untouched.
///
/// Useful as a tap anywhere in a pipeline, typically appended when a chain is
/// configured verbose.
#[derive(Copy, Clone, Debug, Default)]
pub struct LoggingHandler;

#[async_trait]
impl<Out: Send + 'static> EventHandler<Out> for LoggingHandler {
    async fn handle(
        &self,
        event: &ChainEvent,
        prev: Option<Out>,
    ) -> Result<Option<Out>, RelayError> {
        info!(
            chain = %event.chain,
            network = %event.network,
            block = event.block_number,
            kind = %event.kind(),
            "received event"
        );
        Ok(prev)
    }
}
