//! Mock adapters shared by the integration tests.
//!
//! The listener is exercised with `ChainEvent` itself as the raw item type
//! and an identity processor, so tests can feed arbitrary canonical events
//! through the live and catch-up paths and observe what the handler chain
//! receives.

#![allow(dead_code)]

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use event_relay::{
    native::NativeEvent, CatchupSource, ChainEvent, DisconnectedRange, EventHandler, EventKind,
    EventPayload, EventPoller, EventProcessor, EventSubscriber, FeedMessage, HandlerEntry,
    Listener, ListenerConfig, Network, ReconnectRangeProvider, RelayError, StorageFetcher,
};
use tokio::sync::mpsc;

pub type Raw = ChainEvent;
pub type Out = u64;

pub const TEST_CHAIN: &str = "testnet";

pub fn transfer_event(block: u64) -> ChainEvent {
    let payload = NativeEvent::Transfer {
        from: Address::repeat_byte(0x01),
        to: Address::repeat_byte(0x02),
        value: U256::from(1_000u64),
    };
    ChainEvent::new(block, Network::Native, EventPayload::Native(payload))
}

pub fn deploy_event(block: u64) -> ChainEvent {
    let payload = NativeEvent::ContractDeployed {
        deployer: Address::repeat_byte(0x03),
        contract: Address::repeat_byte(0x04),
    };
    ChainEvent::new(block, Network::Native, EventPayload::Native(payload))
}

/// Passes raw items through unchanged; raw items *are* canonical events here.
pub struct IdentityProcessor;

#[async_trait]
impl EventProcessor for IdentityProcessor {
    type Raw = Raw;

    async fn process(&self, raw: Raw) -> Vec<ChainEvent> {
        vec![raw]
    }
}

/// Subscriber handing out a channel the test feeds directly.
///
/// `failures` initial `subscribe` calls fail, to exercise the
/// "log-and-stay-unsubscribed" policy.
pub struct ChannelSubscriber {
    feed: Option<mpsc::Receiver<FeedMessage<Raw>>>,
    failures: usize,
}

impl ChannelSubscriber {
    pub fn new() -> (Self, mpsc::Sender<FeedMessage<Raw>>) {
        Self::failing(0)
    }

    pub fn failing(failures: usize) -> (Self, mpsc::Sender<FeedMessage<Raw>>) {
        let (sender, receiver) = mpsc::channel(64);
        (Self { feed: Some(receiver), failures }, sender)
    }
}

#[async_trait]
impl EventSubscriber for ChannelSubscriber {
    type Raw = Raw;

    async fn subscribe(&mut self) -> Result<mpsc::Receiver<FeedMessage<Raw>>, RelayError> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(RelayError::SubscriptionClosed);
        }
        self.feed.take().ok_or(RelayError::SubscriptionClosed)
    }

    async fn unsubscribe(&mut self) {}
}

/// Storage fetcher returning canned events while recording every requested
/// range.
pub struct RecordingFetcher {
    pub calls: Arc<Mutex<Vec<Option<DisconnectedRange>>>>,
    events: Vec<ChainEvent>,
    fail: bool,
}

impl RecordingFetcher {
    pub fn returning(events: Vec<ChainEvent>) -> Self {
        Self { calls: Arc::new(Mutex::new(Vec::new())), events, fail: false }
    }

    pub fn failing() -> Self {
        Self { calls: Arc::new(Mutex::new(Vec::new())), events: Vec::new(), fail: true }
    }

    pub fn ranges(&self) -> Vec<Option<DisconnectedRange>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageFetcher for RecordingFetcher {
    async fn fetch(
        &self,
        range: Option<DisconnectedRange>,
    ) -> Result<Vec<ChainEvent>, RelayError> {
        self.calls.lock().unwrap().push(range);
        if self.fail {
            return Err(RelayError::SubscriptionClosed);
        }
        Ok(self.events.clone())
    }

    async fn fetch_one(&self, _id: &str) -> Result<Vec<ChainEvent>, RelayError> {
        Ok(Vec::new())
    }
}

/// Poller producing one transfer event per block of the requested range.
pub struct RangePoller {
    pub calls: Arc<Mutex<Vec<DisconnectedRange>>>,
    head: u64,
}

impl RangePoller {
    pub fn with_head(head: u64) -> Self {
        Self { calls: Arc::new(Mutex::new(Vec::new())), head }
    }

    fn bounds(&self, range: DisconnectedRange) -> (u64, u64) {
        (range.start_block.unwrap_or(0), range.end_block.unwrap_or(self.head))
    }
}

#[async_trait]
impl EventPoller for RangePoller {
    type Raw = Raw;

    async fn poll(&self, range: DisconnectedRange) -> Result<Vec<Raw>, RelayError> {
        self.calls.lock().unwrap().push(range);
        let (start, end) = self.bounds(range);
        Ok((start..=end).map(transfer_event).collect())
    }

    async fn poll_each(
        &self,
        range: DisconnectedRange,
        sink: mpsc::Sender<Raw>,
    ) -> Result<(), RelayError> {
        self.calls.lock().unwrap().push(range);
        let (start, end) = self.bounds(range);
        for block in start..=end {
            if sink.send(transfer_event(block)).await.is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Reconnect-range source returning a fixed answer, counting invocations.
pub struct FixedDiscover {
    range: Option<DisconnectedRange>,
    pub calls: Arc<AtomicUsize>,
}

impl FixedDiscover {
    pub fn returning(range: Option<DisconnectedRange>) -> Self {
        Self { range, calls: Arc::new(AtomicUsize::new(0)) }
    }
}

#[async_trait]
impl ReconnectRangeProvider for FixedDiscover {
    async fn discover(&self, _chain: &str) -> Result<Option<DisconnectedRange>, RelayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.range)
    }
}

pub struct FailingDiscover;

#[async_trait]
impl ReconnectRangeProvider for FailingDiscover {
    async fn discover(&self, _chain: &str) -> Result<Option<DisconnectedRange>, RelayError> {
        Err(RelayError::SubscriptionClosed)
    }
}

/// Records `(block, prev)` for every delivered event and optionally emits a
/// fixed accumulator value for the next handler.
pub struct RecordingHandler {
    pub seen: Arc<Mutex<Vec<(u64, Option<Out>)>>>,
    emit: Option<Out>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self { seen: Arc::new(Mutex::new(Vec::new())), emit: None }
    }

    pub fn emitting(value: Out) -> Self {
        Self { seen: Arc::new(Mutex::new(Vec::new())), emit: Some(value) }
    }

    pub fn blocks(&self) -> Vec<u64> {
        self.seen.lock().unwrap().iter().map(|(block, _)| *block).collect()
    }

    pub fn prevs(&self) -> Vec<Option<Out>> {
        self.seen.lock().unwrap().iter().map(|(_, prev)| *prev).collect()
    }
}

#[async_trait]
impl EventHandler<Out> for RecordingHandler {
    async fn handle(
        &self,
        event: &ChainEvent,
        prev: Option<Out>,
    ) -> Result<Option<Out>, RelayError> {
        assert_eq!(event.chain, TEST_CHAIN, "listener must stamp the chain id");
        assert!(event.received.is_some(), "listener must stamp the receipt time");
        self.seen.lock().unwrap().push((event.block_number, prev));
        Ok(self.emit.or(prev))
    }
}

/// Records every delivered block and fails on one of them.
pub struct FailingHandler {
    pub seen: Arc<Mutex<Vec<u64>>>,
    fail_on: u64,
}

impl FailingHandler {
    pub fn failing_on(block: u64) -> Self {
        Self { seen: Arc::new(Mutex::new(Vec::new())), fail_on: block }
    }

    pub fn blocks(&self) -> Vec<u64> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventHandler<Out> for FailingHandler {
    async fn handle(
        &self,
        event: &ChainEvent,
        prev: Option<Out>,
    ) -> Result<Option<Out>, RelayError> {
        self.seen.lock().unwrap().push(event.block_number);
        if event.block_number == self.fail_on {
            return Err(RelayError::handler(std::io::Error::other("boom")));
        }
        Ok(prev)
    }
}

pub fn test_config() -> ListenerConfig {
    ListenerConfig::new(TEST_CHAIN, "ws://unused")
}

pub fn build_listener(
    config: ListenerConfig,
    subscriber: ChannelSubscriber,
    catchup: CatchupSource<Raw>,
    handlers: Vec<HandlerEntry<Out>>,
    global_excluded: HashSet<EventKind>,
    discover: Option<Arc<dyn ReconnectRangeProvider>>,
) -> Listener<Raw, Out> {
    Listener::new(
        config,
        Network::Native,
        Box::new(subscriber),
        Arc::new(IdentityProcessor),
        catchup,
        handlers,
        global_excluded,
        discover,
    )
}
