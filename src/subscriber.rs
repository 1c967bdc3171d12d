//! Live log feed shared by the log-oriented adapter families.

use alloy::{
    network::Ethereum,
    providers::{Provider, RootProvider},
    pubsub::Subscription,
    rpc::types::{Filter, Log},
};
use async_trait::async_trait;
use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{EventSubscriber, FeedMessage, RelayError};

const FEED_CHANNEL_CAPACITY: usize = 1024;

/// Live contract-log feed.
///
/// Wraps a pubsub log subscription and pumps raw logs into the feed channel.
/// If the underlying session drops, the pump resubscribes and emits
/// [`FeedMessage::Reconnected`] in-band before resuming, so the listener can
/// reconcile missed blocks without ever racing live delivery.
#[derive(Debug)]
pub struct LogSubscriber {
    provider: RootProvider<Ethereum>,
    filter: Filter,
    chain: String,
    pump: Option<JoinHandle<()>>,
}

impl LogSubscriber {
    #[must_use]
    pub fn new(provider: RootProvider<Ethereum>, filter: Filter, chain: impl Into<String>) -> Self {
        Self { provider, filter, chain: chain.into(), pump: None }
    }
}

#[async_trait]
impl EventSubscriber for LogSubscriber {
    type Raw = Log;

    async fn subscribe(&mut self) -> Result<mpsc::Receiver<FeedMessage<Log>>, RelayError> {
        // Readiness: confirm the endpoint answers identity reads before any
        // log is classified against this build's ABI.
        let chain_id = self.provider.get_chain_id().await?;
        let subscription = self.provider.subscribe_logs(&self.filter).await?;
        info!(chain = %self.chain, chain_id, "live log feed attached");

        let (feed, receiver) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        let provider = self.provider.clone();
        let filter = self.filter.clone();
        let chain = self.chain.clone();
        self.pump = Some(tokio::spawn(pump(subscription, provider, filter, feed, chain)));
        Ok(receiver)
    }

    async fn unsubscribe(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
            let _ = pump.await;
            debug!(chain = %self.chain, "log feed detached");
        } else {
            debug!(chain = %self.chain, "no live log feed to detach");
        }
    }
}

async fn pump(
    mut subscription: Subscription<Log>,
    provider: RootProvider<Ethereum>,
    filter: Filter,
    feed: mpsc::Sender<FeedMessage<Log>>,
    chain: String,
) {
    loop {
        match subscription.recv().await {
            Ok(log) => {
                if feed.send(FeedMessage::Item(log)).await.is_err() {
                    debug!(chain, "feed receiver dropped, stopping pump");
                    return;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(chain, skipped, "live log feed lagged, logs were skipped");
            }
            Err(RecvError::Closed) => {
                warn!(chain, "log subscription dropped, resubscribing");
                match provider.subscribe_logs(&filter).await {
                    Ok(next) => {
                        subscription = next;
                        info!(chain, "log subscription re-established");
                        if feed.send(FeedMessage::Reconnected).await.is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        error!(chain, error = %err, "failed to resubscribe, live feed ends");
                        return;
                    }
                }
            }
        }
    }
}
