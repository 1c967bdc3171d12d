//! ERC20 token adapter family.
//!
//! One listener watches any number of token contracts over a single
//! endpoint; transfers and approvals are normalized with both parties
//! recorded as interested addresses. An optional permill-of-total-supply
//! threshold suppresses dust transfers, at the cost of one `totalSupply()`
//! read per candidate transfer.

use std::{collections::HashSet, sync::Arc};

use alloy::rpc::types::{Filter, Log};

use crate::{
    listener::{CatchupSource, HandlerEntry, Listener, ListenerConfig},
    provider,
    subscriber::LogSubscriber,
    EventKind, Network, ReconnectRangeProvider, RelayError,
};

mod enrich;
mod fetcher;
mod processor;
mod types;

pub use enrich::enrich;
pub use fetcher::TokenFetcher;
pub use processor::TokenProcessor;
pub use types::{TokenEvent, TokenEventKind};

/// Connects to the configured endpoint and assembles a token listener.
pub async fn create_listener<Out: Send + 'static>(
    config: ListenerConfig,
    handlers: Vec<HandlerEntry<Out>>,
    global_excluded: HashSet<EventKind>,
    discover: Option<Arc<dyn ReconnectRangeProvider>>,
) -> Result<Listener<Log, Out>, RelayError> {
    let provider = provider::connect(&config.chain, &config.url, &config.contract_addresses).await?;

    let filter = Filter::new().address(config.contract_addresses.clone());
    let subscriber = LogSubscriber::new(provider.clone(), filter, config.chain.clone());
    let processor = Arc::new(TokenProcessor::new(
        provider.clone(),
        config.enricher.clone(),
        config.chain.clone(),
    ));
    let fetcher = Arc::new(TokenFetcher::new(
        provider,
        config.contract_addresses.clone(),
        config.enricher.clone(),
        config.chain.clone(),
    ));

    Ok(Listener::new(
        config,
        Network::Token,
        Box::new(subscriber),
        processor,
        CatchupSource::Fetcher(fetcher),
        handlers,
        global_excluded,
        discover,
    ))
}
