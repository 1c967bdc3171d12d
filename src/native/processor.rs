use std::collections::HashMap;

use alloy::{
    consensus::Transaction as _,
    network::{Ethereum, TransactionResponse},
    providers::{Provider, RootProvider},
    rpc::types::{Block, Transaction, TransactionReceipt},
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    native::NativeEvent, ChainEvent, EnricherConfig, EventPayload, EventProcessor, Network,
};

/// Converts one raw block into canonical native events.
///
/// Only transactions whose receipt reports success are classified; a failed
/// transaction never produces an event. A block whose receipts cannot be
/// read is dropped whole, with a log record, and the stream continues.
#[derive(Debug)]
pub struct NativeProcessor {
    provider: RootProvider<Ethereum>,
    config: EnricherConfig,
    chain: String,
}

impl NativeProcessor {
    #[must_use]
    pub fn new(
        provider: RootProvider<Ethereum>,
        config: EnricherConfig,
        chain: impl Into<String>,
    ) -> Self {
        Self { provider, config, chain: chain.into() }
    }
}

#[async_trait]
impl EventProcessor for NativeProcessor {
    type Raw = Block;

    async fn process(&self, block: Block) -> Vec<ChainEvent> {
        let number = block.header.number;
        let receipts = match self.provider.get_block_receipts(number.into()).await {
            Ok(Some(receipts)) => receipts,
            Ok(None) => {
                warn!(chain = %self.chain, block = number, "no receipts for block, dropping it");
                return Vec::new();
            }
            Err(err) => {
                warn!(
                    chain = %self.chain,
                    block = number,
                    error = %err,
                    "failed to read receipts, dropping block"
                );
                return Vec::new();
            }
        };
        let by_hash: HashMap<_, _> =
            receipts.iter().map(|receipt| (receipt.transaction_hash, receipt)).collect();

        let mut events = Vec::new();
        for tx in block.transactions.txns() {
            let Some(receipt) = by_hash.get(&tx.tx_hash()) else {
                debug!(chain = %self.chain, tx = %tx.tx_hash(), "no receipt for transaction, skipping");
                continue;
            };
            if !receipt.status() {
                continue;
            }
            if let Some(event) = enrich_transaction(number, tx, receipt, &self.config) {
                events.push(event);
            }
        }
        events
    }
}

/// Classifies one successful transaction by shape and builds its payload.
///
/// `None` means the transaction carries nothing of interest (zero value, or a
/// transfer below the configured threshold).
pub(crate) fn enrich_transaction(
    block_number: u64,
    tx: &Transaction,
    receipt: &TransactionReceipt,
    config: &EnricherConfig,
) -> Option<ChainEvent> {
    let from = tx.from();
    match tx.to() {
        Some(to) => {
            let value = tx.value();
            if value.is_zero() {
                return None;
            }
            if config.transfer_threshold_wei.is_some_and(|threshold| value < threshold) {
                debug!(%from, %to, %value, "transfer below threshold, suppressed");
                return None;
            }
            let payload = NativeEvent::Transfer { from, to, value };
            Some(
                ChainEvent::new(block_number, Network::Native, EventPayload::Native(payload))
                    .exclude([from]),
            )
        }
        None => {
            let contract = receipt.contract_address?;
            let payload = NativeEvent::ContractDeployed { deployer: from, contract };
            Some(
                ChainEvent::new(block_number, Network::Native, EventPayload::Native(payload))
                    .exclude([from]),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::{
        consensus::{
            transaction::Recovered, Eip658Value, Receipt, ReceiptEnvelope, ReceiptWithBloom,
            Signed, TxEnvelope, TxLegacy,
        },
        primitives::{Address, Bloom, Bytes, Signature, TxKind, B256, U256},
    };

    use super::*;

    const SENDER: Address = Address::repeat_byte(0x01);
    const RECIPIENT: Address = Address::repeat_byte(0x02);

    fn tx(to: Option<Address>, value: u64) -> Transaction {
        let legacy = TxLegacy {
            chain_id: None,
            nonce: 0,
            gas_price: 0,
            gas_limit: 21_000,
            to: to.map_or(TxKind::Create, TxKind::Call),
            value: U256::from(value),
            input: Bytes::new(),
        };
        let signature = Signature::new(U256::from(1u64), U256::from(1u64), false);
        let signed = Signed::new_unchecked(legacy, signature, B256::repeat_byte(0x99));
        Transaction {
            inner: Recovered::new_unchecked(TxEnvelope::Legacy(signed), SENDER),
            block_hash: None,
            block_number: Some(5),
            transaction_index: None,
            effective_gas_price: None,
        }
    }

    fn receipt(success: bool, contract: Option<Address>) -> TransactionReceipt {
        TransactionReceipt {
            inner: ReceiptEnvelope::Legacy(ReceiptWithBloom {
                receipt: Receipt {
                    status: Eip658Value::Eip658(success),
                    cumulative_gas_used: 0,
                    logs: Vec::new(),
                },
                logs_bloom: Bloom::ZERO,
            }),
            transaction_hash: B256::repeat_byte(0x99),
            transaction_index: None,
            block_hash: None,
            block_number: Some(5),
            gas_used: 21_000,
            effective_gas_price: 0,
            blob_gas_used: None,
            blob_gas_price: None,
            from: SENDER,
            to: None,
            contract_address: contract,
        }
    }

    #[test]
    fn value_transfer_becomes_a_transfer_event() {
        let event =
            enrich_transaction(5, &tx(Some(RECIPIENT), 1_000), &receipt(true, None), &EnricherConfig::default())
                .expect("transfer expected");

        assert_eq!(event.block_number, 5);
        assert_eq!(event.exclude_addresses, vec![SENDER]);
        match event.data {
            EventPayload::Native(NativeEvent::Transfer { from, to, value }) => {
                assert_eq!(from, SENDER);
                assert_eq!(to, RECIPIENT);
                assert_eq!(value, U256::from(1_000u64));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn zero_value_calls_are_not_events() {
        let event =
            enrich_transaction(5, &tx(Some(RECIPIENT), 0), &receipt(true, None), &EnricherConfig::default());
        assert!(event.is_none());
    }

    #[test]
    fn transfers_below_threshold_are_suppressed() {
        let config = EnricherConfig {
            transfer_threshold_wei: Some(U256::from(10_000u64)),
            ..EnricherConfig::default()
        };
        let event = enrich_transaction(5, &tx(Some(RECIPIENT), 1_000), &receipt(true, None), &config);
        assert!(event.is_none());
    }

    #[test]
    fn deployment_becomes_a_contract_deployed_event() {
        let deployed = Address::repeat_byte(0x0c);
        let event =
            enrich_transaction(5, &tx(None, 0), &receipt(true, Some(deployed)), &EnricherConfig::default())
                .expect("deployment expected");

        match event.data {
            EventPayload::Native(NativeEvent::ContractDeployed { deployer, contract }) => {
                assert_eq!(deployer, SENDER);
                assert_eq!(contract, deployed);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
