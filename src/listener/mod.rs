//! Per-chain orchestrator: lifecycle, catch-up, and ordered delivery.
//!
//! One [`Listener`] runs per configured chain, as its own unit of
//! concurrency. Construction (the family modules' `create_listener`
//! functions) connects to the endpoint with retry and builds the family's
//! adapters; [`Listener::subscribe`] replays missed blocks and attaches the
//! live feed; [`Listener::unsubscribe`] detaches it again. Every canonical
//! event flows through the caller-supplied handler chain in order.

use std::{collections::HashSet, sync::Arc};

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::{
    EventKind, EventProcessor, EventSubscriber, Network, ReconnectRangeProvider,
};

mod dispatch;

pub use dispatch::{CatchupSource, HandlerEntry};
pub(crate) use dispatch::{Dispatcher, Watermark};

/// Default number of blocks fetched per ranged RPC request.
pub const DEFAULT_BATCH_SIZE: u64 = 100;

/// Thresholds applied during enrichment.
///
/// A value below its threshold makes enrichment return "no event", a valid
/// suppression, not an error. Absent thresholds suppress nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnricherConfig {
    /// Votes with weight strictly below this are not emitted.
    #[serde(default)]
    pub vote_weight_threshold: Option<U256>,
    /// Native transfers moving strictly less than this (in wei) are not
    /// emitted.
    #[serde(default)]
    pub transfer_threshold_wei: Option<U256>,
    /// Token transfers moving strictly less than
    /// `totalSupply * permill / 1_000_000` are not emitted. Checking this
    /// costs one `totalSupply()` read per candidate transfer.
    #[serde(default)]
    pub transfer_threshold_permill: Option<u32>,
}

/// Per-listener configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Identifier stamped onto every event and log record for this chain.
    pub chain: String,
    /// RPC endpoint; live subscription requires a pubsub-capable transport.
    pub url: String,
    /// Contracts observed by log-oriented families. Also part of the
    /// connection liveness check: an endpoint without code at these addresses
    /// is treated as a failed connection attempt.
    #[serde(default)]
    pub contract_addresses: Vec<Address>,
    /// First block of interest; used by archival replay.
    #[serde(default)]
    pub start_block: Option<u64>,
    /// Skip missed-block catch-up and go straight to the live feed.
    #[serde(default)]
    pub skip_catchup: bool,
    /// Bulk-replay history through the handler chain and never go live.
    #[serde(default)]
    pub archival: bool,
    /// Log every delivered event at info level.
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub enricher: EnricherConfig,
    /// Blocks per ranged RPC request during polling.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
}

fn default_batch_size() -> u64 {
    DEFAULT_BATCH_SIZE
}

impl ListenerConfig {
    pub fn new(chain: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            chain: chain.into(),
            url: url.into(),
            contract_addresses: Vec::new(),
            start_block: None,
            skip_catchup: false,
            archival: false,
            verbose: false,
            enricher: EnricherConfig::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    #[must_use]
    pub fn contract_address(mut self, address: Address) -> Self {
        self.contract_addresses.push(address);
        self
    }

    #[must_use]
    pub fn start_block(mut self, block: u64) -> Self {
        self.start_block = Some(block);
        self
    }

    #[must_use]
    pub fn skip_catchup(mut self, skip: bool) -> Self {
        self.skip_catchup = skip;
        self
    }

    #[must_use]
    pub fn archival(mut self, archival: bool) -> Self {
        self.archival = archival;
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub fn enricher(mut self, enricher: EnricherConfig) -> Self {
        self.enricher = enricher;
        self
    }

    #[must_use]
    pub fn batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// Per-chain ingestion orchestrator.
///
/// Generic over the family's raw item type `R` and the handler pipeline's
/// accumulator type `Out`. All mutable state (`subscribed`, the watermark,
/// the attached adapters) has a single writer: the listener itself, or the
/// one delivery task it spawns while subscribed.
pub struct Listener<R, Out> {
    config: ListenerConfig,
    subscriber: Box<dyn EventSubscriber<Raw = R>>,
    dispatcher: Option<Dispatcher<R, Out>>,
    delivery: Option<JoinHandle<Dispatcher<R, Out>>>,
    watermark: Arc<Watermark>,
    subscribed: bool,
}

impl<R, Out> std::fmt::Debug for Listener<R, Out> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("chain", &self.config.chain)
            .field("subscribed", &self.subscribed)
            .field("last_block", &self.watermark.get())
            .finish_non_exhaustive()
    }
}

impl<R: Send + 'static, Out: Send + 'static> Listener<R, Out> {
    /// Assembles a listener from already-connected adapters.
    ///
    /// The family modules' `create_listener` functions are the usual way to
    /// get here; constructing directly is for custom families and tests.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: ListenerConfig,
        network: Network,
        subscriber: Box<dyn EventSubscriber<Raw = R>>,
        processor: Arc<dyn EventProcessor<Raw = R>>,
        catchup: CatchupSource<R>,
        handlers: Vec<HandlerEntry<Out>>,
        global_excluded: HashSet<EventKind>,
        discover: Option<Arc<dyn ReconnectRangeProvider>>,
    ) -> Self {
        let watermark = Arc::new(Watermark::default());
        let dispatcher = Dispatcher {
            chain: config.chain.clone(),
            network,
            verbose: config.verbose,
            processor,
            catchup,
            discover,
            handlers,
            global_excluded,
            watermark: Arc::clone(&watermark),
        };
        Self {
            config,
            subscriber,
            dispatcher: Some(dispatcher),
            delivery: None,
            watermark,
            subscribed: false,
        }
    }

    /// Replays missed blocks, then attaches the live feed.
    ///
    /// With `skip_catchup` set, goes straight to the live feed. With
    /// `archival` set, bulk-replays history instead and never goes live. A
    /// live-subscription failure is logged and swallowed; the listener keeps
    /// running unsubscribed rather than tearing the process down.
    pub async fn subscribe(&mut self) {
        if self.subscribed {
            warn!(chain = %self.config.chain, "already subscribed");
            return;
        }
        let Some(dispatcher) = self.dispatcher.take() else {
            error!(chain = %self.config.chain, "delivery state missing, cannot subscribe");
            return;
        };

        if self.config.archival {
            let start = self.config.start_block.unwrap_or(0);
            info!(chain = %self.config.chain, start, "starting archival replay");
            if let Err(err) = dispatcher.replay_archive(start).await {
                error!(chain = %self.config.chain, error = %err, "archival replay failed");
            }
            self.dispatcher = Some(dispatcher);
            return;
        }

        if self.config.skip_catchup {
            info!(chain = %self.config.chain, "skipping catch-up");
        } else {
            dispatcher.process_missed_blocks().await;
        }

        match self.subscriber.subscribe().await {
            Ok(feed) => {
                self.delivery = Some(tokio::spawn(dispatcher.run(feed)));
                self.subscribed = true;
                info!(chain = %self.config.chain, "subscribed to live feed");
            }
            Err(err) => {
                error!(
                    chain = %self.config.chain,
                    error = %err,
                    "failed to subscribe, listener stays unsubscribed"
                );
                self.dispatcher = Some(dispatcher);
            }
        }
    }

    /// Detaches the live feed and waits for in-flight delivery to finish.
    ///
    /// Idempotent: when not subscribed this logs a warning and does nothing.
    /// An in-flight catch-up or enrichment call runs to completion before
    /// this returns.
    pub async fn unsubscribe(&mut self) {
        if !self.subscribed {
            warn!(chain = %self.config.chain, "not subscribed, nothing to unsubscribe");
            return;
        }
        self.subscriber.unsubscribe().await;
        if let Some(delivery) = self.delivery.take() {
            match delivery.await {
                Ok(dispatcher) => self.dispatcher = Some(dispatcher),
                Err(err) => {
                    error!(
                        chain = %self.config.chain,
                        error = %err,
                        "delivery task failed during shutdown"
                    );
                }
            }
        }
        self.subscribed = false;
        info!(chain = %self.config.chain, "unsubscribed");
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Highest block number seen by this listener instance, if any.
    ///
    /// Process-memory only; reconciled against the externally persisted
    /// watermark during catch-up, never a replacement for it.
    #[must_use]
    pub fn last_block(&self) -> Option<u64> {
        self.watermark.get()
    }

    #[must_use]
    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }
}
