//! EVM governance-contract adapter family.
//!
//! Observes governance contracts through their event logs: live delivery via
//! a pubsub log subscription, catch-up via ranged `eth_getLogs` queries over
//! the same classification and enrichment path.

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
pub use fetcher::GovernanceFetcher;
pub use processor::GovernanceProcessor;
pub use types::{GovernanceEvent, GovernanceEventKind};

/// Connects to the configured endpoint and assembles a governance listener.
///
/// Connection is retried with a fixed delay and includes a liveness check
/// that the configured contracts are actually deployed; exhausting the
/// attempts is fatal for this chain and surfaces here.
pub async fn create_listener<Out: Send + 'static>(
    config: ListenerConfig,
    handlers: Vec<HandlerEntry<Out>>,
    global_excluded: HashSet<EventKind>,
    discover: Option<Arc<dyn ReconnectRangeProvider>>,
) -> Result<Listener<Log, Out>, RelayError> {
    let provider = provider::connect(&config.chain, &config.url, &config.contract_addresses).await?;

    let filter = Filter::new().address(config.contract_addresses.clone());
    let subscriber = LogSubscriber::new(provider.clone(), filter, config.chain.clone());
    let processor = Arc::new(GovernanceProcessor::new(
        provider.clone(),
        config.enricher.clone(),
        config.chain.clone(),
    ));
    let fetcher = Arc::new(GovernanceFetcher::new(
        provider,
        config.contract_addresses.clone(),
        config.enricher.clone(),
        config.chain.clone(),
    ));

    Ok(Listener::new(
        config,
        Network::Governance,
        Box::new(subscriber),
        processor,
        CatchupSource::Fetcher(fetcher),
        handlers,
        global_excluded,
        discover,
    ))
}
