use alloy::{
    network::Ethereum,
    providers::{Provider, RootProvider},
    pubsub::Subscription,
    rpc::types::{Block, Header},
};
use async_trait::async_trait;
use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{EventSubscriber, FeedMessage, RelayError};

const FEED_CHANNEL_CAPACITY: usize = 256;

/// Live block feed for the native family.
///
/// Subscribes to new block headers and resolves each into a full block before
/// handing it to the listener; the processor needs the transaction bodies. A
/// dropped session is resubscribed with an in-band
/// [`FeedMessage::Reconnected`] marker, like the log-oriented subscriber.
#[derive(Debug)]
pub struct NativeSubscriber {
    provider: RootProvider<Ethereum>,
    chain: String,
    pump: Option<JoinHandle<()>>,
}

impl NativeSubscriber {
    #[must_use]
    pub fn new(provider: RootProvider<Ethereum>, chain: impl Into<String>) -> Self {
        Self { provider, chain: chain.into(), pump: None }
    }
}

#[async_trait]
impl EventSubscriber for NativeSubscriber {
    type Raw = Block;

    async fn subscribe(&mut self) -> Result<mpsc::Receiver<FeedMessage<Block>>, RelayError> {
        let chain_id = self.provider.get_chain_id().await?;
        let subscription = self.provider.subscribe_blocks().await?;
        info!(chain = %self.chain, chain_id, "live block feed attached");

        let (feed, receiver) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        let provider = self.provider.clone();
        let chain = self.chain.clone();
        self.pump = Some(tokio::spawn(pump(subscription, provider, feed, chain)));
        Ok(receiver)
    }

    async fn unsubscribe(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
            let _ = pump.await;
            debug!(chain = %self.chain, "block feed detached");
        } else {
            debug!(chain = %self.chain, "no live block feed to detach");
        }
    }
}

async fn pump(
    mut subscription: Subscription<Header>,
    provider: RootProvider<Ethereum>,
    feed: mpsc::Sender<FeedMessage<Block>>,
    chain: String,
) {
    loop {
        match subscription.recv().await {
            Ok(header) => {
                let number = header.number;
                match provider.get_block_by_number(number.into()).full().await {
                    Ok(Some(block)) => {
                        if feed.send(FeedMessage::Item(block)).await.is_err() {
                            debug!(chain, "feed receiver dropped, stopping pump");
                            return;
                        }
                    }
                    Ok(None) => {
                        warn!(chain, block = number, "announced block not available, skipping");
                    }
                    Err(err) => {
                        warn!(
                            chain,
                            block = number,
                            error = %err,
                            "failed to fetch block body, skipping"
                        );
                    }
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(chain, skipped, "live block feed lagged, blocks were skipped");
            }
            Err(RecvError::Closed) => {
                warn!(chain, "block subscription dropped, resubscribing");
                match provider.subscribe_blocks().await {
                    Ok(next) => {
                        subscription = next;
                        info!(chain, "block subscription re-established");
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
