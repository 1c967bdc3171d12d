//! event-relay ingests state-change events from independent chains,
//! normalizes them into one canonical shape, and delivers them through
//! ordered handler pipelines.
//!
//! Each configured chain runs one [`Listener`], an independent unit of
//! concurrency. A listener's life:
//!
//! 1. **Construct** via a family's `create_listener` (e.g.
//!    [`governance::create_listener`]): connects to the endpoint with bounded
//!    retry and builds the family's adapters. Failure here is fatal for that
//!    chain.
//! 2. **Subscribe** ([`Listener::subscribe`]): replays blocks missed while
//!    offline, then attaches the live feed. The catch-up range comes from a
//!    caller-supplied [`ReconnectRangeProvider`] reconciled against the
//!    listener's own in-memory watermark; with no usable start block nothing
//!    is replayed, never "from block 0" by default.
//! 3. **Deliver**: every canonical [`ChainEvent`] flows through the ordered
//!    [`EventHandler`] chain, each handler receiving the previous handler's
//!    output. A failing handler skips the rest of the chain for that one
//!    event only.
//!
//! # Adapter families
//!
//! Chain specifics live behind the capability traits in [`adapter`]:
//! [`EventSubscriber`], [`EventProcessor`], [`StorageFetcher`],
//! [`EventPoller`]. Two families ship in-tree:
//!
//! * [`governance`]: EVM governance contracts, observed through event logs;
//!   catch-up via ranged log queries.
//! * [`token`]: ERC20 token contracts; several tokens can share one listener
//!   and one endpoint.
//! * [`native`]: native-currency transfers and deployments, which emit no
//!   logs; the family is block-oriented and catch-up polls raw block ranges
//!   through the processor.
//!
//! # Ordering and delivery guarantees
//!
//! Ordering holds per chain only; there is no cross-chain ordering. Catch-up
//! batches are delivered in ascending block order before live delivery
//! begins, and a reconnect-triggered catch-up re-run is serialized in-band
//! with live items. Delivery is best-effort at-least-once around restarts:
//! the durable watermark belongs to the consumer, and idempotent re-fetch is
//! the recovery mechanism, not transactional delivery.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use event_relay::{
//!     governance, ChainEvent, EventHandler, HandlerEntry, ListenerConfig, RelayError,
//! };
//!
//! struct Print;
//!
//! #[async_trait::async_trait]
//! impl EventHandler<u64> for Print {
//!     async fn handle(
//!         &self,
//!         event: &ChainEvent,
//!         prev: Option<u64>,
//!     ) -> Result<Option<u64>, RelayError> {
//!         println!("block {}: {}", event.block_number, event.kind());
//!         Ok(prev)
//!     }
//! }
//!
//! # async fn example() -> Result<(), RelayError> {
//! let config = ListenerConfig::new("my-dao", "ws://localhost:8545")
//!     .contract_address("0xd8dA6BF26964af9d7eed9e03e53415d37aa96045".parse().unwrap());
//!
//! let mut listener = governance::create_listener(
//!     config,
//!     vec![HandlerEntry::new(Arc::new(Print))],
//!     Default::default(),
//!     None,
//! )
//! .await?;
//!
//! listener.subscribe().await;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod governance;
pub mod listener;
pub mod native;
pub mod provider;
pub mod token;

mod error;
mod subscriber;
mod types;

pub use adapter::{
    EventHandler, EventPoller, EventProcessor, EventSubscriber, FeedMessage, LoggingHandler,
    ReconnectRangeProvider, StorageFetcher,
};
pub use error::RelayError;
pub use subscriber::LogSubscriber;
pub use listener::{
    CatchupSource, EnricherConfig, HandlerEntry, Listener, ListenerConfig, DEFAULT_BATCH_SIZE,
};
pub use types::{ChainEvent, DisconnectedRange, EventKind, EventPayload, Network};
