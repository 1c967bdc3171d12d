//! Maps a classified token log into a fully-typed canonical event.
//!
//! A transfer can be suppressed by the permill-of-total-supply threshold,
//! which requires a `totalSupply()` read back against the emitting contract;
//! with no threshold configured, no extra chain read happens.

use std::sync::Arc;

use alloy::{
    network::Ethereum,
    primitives::U256,
    providers::RootProvider,
    rpc::types::Log,
    sol_types::SolEvent,
};
use tracing::debug;

use crate::{
    token::types::{abi, TokenEvent, TokenEventKind},
    ChainEvent, EnricherConfig, EventPayload, Network, RelayError,
};

const PERMILL_DENOMINATOR: u64 = 1_000_000;

pub async fn enrich(
    provider: &RootProvider<Ethereum>,
    block_number: u64,
    kind: TokenEventKind,
    log: &Log,
    config: &EnricherConfig,
) -> Result<Option<ChainEvent>, RelayError> {
    let event = match kind {
        TokenEventKind::Transfer => {
            let decoded = abi::IERC20::Transfer::decode_log(&log.inner)
                .map_err(|err| RelayError::Decode("Transfer", Arc::new(err)))?;
            let token = decoded.address;
            let data = decoded.data;

            if let Some(permill) = config.transfer_threshold_permill {
                let supply =
                    abi::IERC20::new(token, provider.clone()).totalSupply().call().await?;
                let threshold =
                    supply.saturating_mul(U256::from(permill)) / U256::from(PERMILL_DENOMINATOR);
                if data.value < threshold {
                    debug!(
                        %token,
                        value = %data.value,
                        %threshold,
                        "transfer below supply threshold, suppressed"
                    );
                    return Ok(None);
                }
            }

            let payload =
                TokenEvent::Transfer { token, from: data.from, to: data.to, amount: data.value };
            let participants = payload.participants();
            ChainEvent::new(block_number, Network::Token, EventPayload::Token(payload))
                .exclude([data.from])
                .include(participants)
        }
        TokenEventKind::Approval => {
            let decoded = abi::IERC20::Approval::decode_log(&log.inner)
                .map_err(|err| RelayError::Decode("Approval", Arc::new(err)))?;
            let token = decoded.address;
            let data = decoded.data;
            let payload = TokenEvent::Approval {
                token,
                owner: data.owner,
                spender: data.spender,
                amount: data.value,
            };
            let participants = payload.participants();
            ChainEvent::new(block_number, Network::Token, EventPayload::Token(payload))
                .exclude([data.owner])
                .include(participants)
        }
    };
    Ok(Some(event))
}
