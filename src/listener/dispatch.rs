use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::SystemTime,
};

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    ChainEvent, DisconnectedRange, EventKind, EventPoller, EventProcessor, FeedMessage, Network,
    ReconnectRangeProvider, StorageFetcher,
};

const ARCHIVAL_CHANNEL_CAPACITY: usize = 64;

/// Highest block number observed by a listener, forward-only.
///
/// Stored as `block + 1` so that zero can mean "unset" while block 0 remains
/// representable; `advance` is a saturating `fetch_max`, which keeps the
/// watermark monotonic even if delivery and catch-up race on it.
#[derive(Debug, Default)]
pub(crate) struct Watermark(AtomicU64);

impl Watermark {
    pub(crate) fn get(&self) -> Option<u64> {
        match self.0.load(Ordering::Acquire) {
            0 => None,
            raised => Some(raised - 1),
        }
    }

    pub(crate) fn advance(&self, block: u64) {
        self.0.fetch_max(block.saturating_add(1), Ordering::AcqRel);
    }
}

/// One stage of the delivery pipeline: a handler plus the event kinds it
/// refuses to see.
pub struct HandlerEntry<Out> {
    pub(crate) handler: Arc<dyn crate::EventHandler<Out>>,
    pub(crate) excluded_kinds: HashSet<EventKind>,
}

impl<Out> HandlerEntry<Out> {
    pub fn new(handler: Arc<dyn crate::EventHandler<Out>>) -> Self {
        Self { handler, excluded_kinds: HashSet::new() }
    }

    /// Skips this handler (and only this handler) for the given kinds.
    #[must_use]
    pub fn excluding(mut self, kinds: impl IntoIterator<Item = EventKind>) -> Self {
        self.excluded_kinds.extend(kinds);
        self
    }
}

impl<Out> std::fmt::Debug for HandlerEntry<Out> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerEntry").field("excluded_kinds", &self.excluded_kinds).finish()
    }
}

/// Where catch-up replay pulls its history from.
///
/// Chains with per-event replay expose a [`StorageFetcher`]; block-oriented
/// chains expose an [`EventPoller`] whose raw blocks are run back through the
/// family's processor.
pub enum CatchupSource<R> {
    Fetcher(Arc<dyn StorageFetcher>),
    Poller(Arc<dyn EventPoller<Raw = R>>),
}

impl<R> std::fmt::Debug for CatchupSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatchupSource::Fetcher(_) => f.write_str("CatchupSource::Fetcher"),
            CatchupSource::Poller(_) => f.write_str("CatchupSource::Poller"),
        }
    }
}

/// The single-writer delivery core of a listener.
///
/// Owns the processor, catch-up source and handler chain. While the listener
/// is subscribed the dispatcher lives inside the delivery task and nothing
/// else touches it; reconnect-triggered catch-up re-runs arrive in-band
/// through the feed channel, so they serialize naturally with live delivery.
pub(crate) struct Dispatcher<R, Out> {
    pub(crate) chain: String,
    pub(crate) network: Network,
    pub(crate) verbose: bool,
    pub(crate) processor: Arc<dyn EventProcessor<Raw = R>>,
    pub(crate) catchup: CatchupSource<R>,
    pub(crate) discover: Option<Arc<dyn ReconnectRangeProvider>>,
    pub(crate) handlers: Vec<HandlerEntry<Out>>,
    pub(crate) global_excluded: HashSet<EventKind>,
    pub(crate) watermark: Arc<Watermark>,
}

impl<R: Send + 'static, Out: Send + 'static> Dispatcher<R, Out> {
    /// Drains the live feed until the subscriber side closes it, then hands
    /// the dispatcher back so the listener can be re-subscribed later.
    pub(crate) async fn run(self, mut feed: mpsc::Receiver<FeedMessage<R>>) -> Self {
        while let Some(message) = feed.recv().await {
            match message {
                FeedMessage::Item(raw) => self.process_item(raw).await,
                FeedMessage::Reconnected => {
                    info!(chain = %self.chain, "connection re-established, reconciling missed blocks");
                    self.process_missed_blocks().await;
                }
            }
        }
        debug!(chain = %self.chain, "live feed closed, delivery task exiting");
        self
    }

    pub(crate) async fn process_item(&self, raw: R) {
        for event in self.processor.process(raw).await {
            self.handle_event(event).await;
        }
    }

    /// Replays the blocks missed while offline, before or between live
    /// delivery.
    ///
    /// The effective range is the externally discovered one, overridden by the
    /// fresher in-memory watermark; with no usable start block nothing is
    /// fetched; never "from block 0" by default. Any failure here abandons
    /// this catch-up attempt and nothing more: live delivery proceeds with an
    /// accepted gap.
    pub(crate) async fn process_missed_blocks(&self) {
        let Some(discover) = &self.discover else {
            info!(chain = %self.chain, "no reconnect range provider configured, skipping catch-up");
            return;
        };
        let discovered = match discover.discover(&self.chain).await {
            Ok(discovered) => discovered,
            Err(err) => {
                warn!(
                    chain = %self.chain,
                    error = %err,
                    "could not discover offline range, skipping catch-up"
                );
                return;
            }
        };
        let Some(discovered) = discovered else {
            info!(chain = %self.chain, "no offline range discovered, skipping catch-up");
            return;
        };
        let Some(range) = reconcile_range(discovered, self.watermark.get()) else {
            info!(chain = %self.chain, "no usable start block, skipping catch-up");
            return;
        };

        info!(
            chain = %self.chain,
            network = %self.network,
            start = ?range.start_block,
            end = ?range.end_block,
            "replaying missed blocks"
        );

        let fetched = match &self.catchup {
            CatchupSource::Fetcher(fetcher) => fetcher.fetch(Some(range)).await,
            CatchupSource::Poller(poller) => match poller.poll(range).await {
                Ok(blocks) => {
                    let mut events = Vec::new();
                    for block in blocks {
                        events.extend(self.processor.process(block).await);
                    }
                    Ok(events)
                }
                Err(err) => Err(err),
            },
        };

        match fetched {
            Ok(events) => {
                info!(chain = %self.chain, count = events.len(), "caught up on missed events");
                for event in events {
                    self.handle_event(event).await;
                }
            }
            Err(err) => {
                warn!(
                    chain = %self.chain,
                    error = %err,
                    "catch-up fetch failed, resuming live delivery without it"
                );
            }
        }
    }

    /// Bulk-replays every block from `start_block` to the current head
    /// through the handler chain, streaming rather than buffering the range.
    ///
    /// Only meaningful for poller-backed (block-oriented) families; a
    /// fetcher-backed family degenerates to one large ranged fetch.
    pub(crate) async fn replay_archive(&self, start_block: u64) -> Result<(), crate::RelayError> {
        let range = DisconnectedRange::from_block(start_block);
        match &self.catchup {
            CatchupSource::Poller(poller) => {
                let (sink, mut blocks) = mpsc::channel(ARCHIVAL_CHANNEL_CAPACITY);
                let produce = poller.poll_each(range, sink);
                let consume = async {
                    while let Some(block) = blocks.recv().await {
                        self.process_item(block).await;
                    }
                };
                let (result, ()) = tokio::join!(produce, consume);
                result
            }
            CatchupSource::Fetcher(fetcher) => {
                let events = fetcher.fetch(Some(range)).await?;
                for event in events {
                    self.handle_event(event).await;
                }
                Ok(())
            }
        }
    }

    /// Delivers one canonical event through the ordered handler chain.
    ///
    /// Stamps the chain identifier and receipt time, advances the watermark,
    /// then folds the handlers, threading each handler's output into the
    /// next. A failing handler aborts the remaining handlers for this event
    /// only.
    pub(crate) async fn handle_event(&self, mut event: ChainEvent) {
        event.chain.clone_from(&self.chain);
        event.received = Some(SystemTime::now());
        self.watermark.advance(event.block_number);

        let kind = event.kind();
        if self.verbose {
            info!(
                chain = %self.chain,
                network = %self.network,
                block = event.block_number,
                kind = %kind,
                "delivering event"
            );
        } else {
            debug!(chain = %self.chain, block = event.block_number, kind = %kind, "delivering event");
        }

        let mut prev: Option<Out> = None;
        for (position, entry) in self.handlers.iter().enumerate() {
            if self.global_excluded.contains(&kind) || entry.excluded_kinds.contains(&kind) {
                debug!(chain = %self.chain, kind = %kind, position, "handler excluded for kind");
                continue;
            }
            match entry.handler.handle(&event, prev).await {
                Ok(next) => prev = next,
                Err(err) => {
                    error!(
                        chain = %self.chain,
                        network = %self.network,
                        block = event.block_number,
                        kind = %kind,
                        position,
                        error = %err,
                        "handler failed, skipping remaining handlers for this event"
                    );
                    return;
                }
            }
        }
    }
}

/// Resolves the effective catch-up range from the externally discovered one
/// and the in-memory watermark.
///
/// The watermark is always at least as fresh as a possibly stale external
/// store, so when set it wins over an older (or absent) discovered start;
/// this prevents re-delivering events already handled live. Returns `None`
/// when no usable start block exists.
pub(crate) fn reconcile_range(
    discovered: DisconnectedRange,
    last_block: Option<u64>,
) -> Option<DisconnectedRange> {
    let mut range = discovered;
    if let Some(last) = last_block {
        if range.start_block.is_none_or(|start| start < last) {
            range.start_block = Some(last);
        }
    }
    range.start_block.is_some().then_some(range)
}
