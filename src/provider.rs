//! Connection establishment with bounded retry.

use std::time::Duration;

use alloy::{
    network::Ethereum,
    primitives::Address,
    providers::{Provider, RootProvider},
};
use backon::{ConstantBuilder, Retryable};
use tracing::{info, warn};

use crate::RelayError;

/// Total connection attempts before giving up on an endpoint.
pub const CONNECT_ATTEMPTS: usize = 3;

/// Fixed delay between connection attempts.
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Connects to `url` and verifies the endpoint is actually usable.
///
/// Each attempt performs the transport handshake plus a liveness check: a
/// current-block-number read, plus (when `contracts` is non-empty) a check
/// that code is deployed at every configured address. A connection that
/// completes the handshake but fails the liveness check counts as a failed
/// attempt and is retried like any other.
///
/// Retries up to [`CONNECT_ATTEMPTS`] times with a fixed
/// [`CONNECT_RETRY_DELAY`] between attempts; exhaustion yields the fatal
/// [`RelayError::Connection`], which aborts listener construction for this
/// chain.
pub async fn connect(
    chain: &str,
    url: &str,
    contracts: &[Address],
) -> Result<RootProvider<Ethereum>, RelayError> {
    let attempt = || async {
        let provider = RootProvider::<Ethereum>::connect(url).await.map_err(RelayError::from)?;
        let head = provider.get_block_number().await?;
        for address in contracts {
            let code = provider.get_code_at(*address).await?;
            if code.is_empty() {
                return Err(RelayError::ContractMissing(*address));
            }
        }
        info!(chain, url, head, "connected");
        Ok(provider)
    };

    attempt
        .retry(
            ConstantBuilder::default()
                .with_delay(CONNECT_RETRY_DELAY)
                .with_max_times(CONNECT_ATTEMPTS - 1),
        )
        .sleep(tokio::time::sleep)
        .notify(|err: &RelayError, delay: Duration| {
            warn!(chain, url, error = %err, "connection attempt failed, retrying in {delay:?}");
        })
        .await
        .map_err(|err| RelayError::Connection {
            chain: chain.to_owned(),
            url: url.to_owned(),
            source: Box::new(err),
        })
}
