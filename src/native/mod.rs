//! Block-oriented adapter family for native-currency activity.
//!
//! Plain value transfers and contract deployments emit no logs, so this
//! family works on whole blocks: the live path subscribes to headers and
//! resolves full blocks, the catch-up path polls raw block ranges and runs
//! them back through the same processor.

use std::{collections::HashSet, sync::Arc};

use alloy::rpc::types::Block;

use crate::{
    listener::{CatchupSource, HandlerEntry, Listener, ListenerConfig},
    provider, EventKind, Network, ReconnectRangeProvider, RelayError,
};

mod poller;
mod processor;
mod subscriber;
mod types;

pub use poller::NativePoller;
pub use processor::NativeProcessor;
pub use subscriber::NativeSubscriber;
pub use types::{NativeEvent, NativeEventKind};

/// Connects to the configured endpoint and assembles a native listener.
pub async fn create_listener<Out: Send + 'static>(
    config: ListenerConfig,
    handlers: Vec<HandlerEntry<Out>>,
    global_excluded: HashSet<EventKind>,
    discover: Option<Arc<dyn ReconnectRangeProvider>>,
) -> Result<Listener<Block, Out>, RelayError> {
    let provider = provider::connect(&config.chain, &config.url, &[]).await?;

    let subscriber = NativeSubscriber::new(provider.clone(), config.chain.clone());
    let processor = Arc::new(NativeProcessor::new(
        provider.clone(),
        config.enricher.clone(),
        config.chain.clone(),
    ));
    let poller = Arc::new(NativePoller::new(provider, config.batch_size, config.chain.clone()));

    Ok(Listener::new(
        config,
        Network::Native,
        Box::new(subscriber),
        processor,
        CatchupSource::Poller(poller),
        handlers,
        global_excluded,
        discover,
    ))
}
