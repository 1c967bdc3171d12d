//! Token-family fetching: participant bookkeeping, the
//! permill-of-total-supply threshold, and single-address lookup.

use alloy::{
    network::Ethereum,
    primitives::{Address, Bytes, B256, U256, U64},
    providers::{mock::Asserter, RootProvider},
    rpc::{client::RpcClient, types::Log},
    sol,
    sol_types::SolEvent,
};
use event_relay::{
    token::{TokenEvent, TokenFetcher},
    DisconnectedRange, EnricherConfig, EventPayload, StorageFetcher,
};

sol! {
    #[derive(Debug)]
    event Transfer(address indexed from, address indexed to, uint256 value);

    #[derive(Debug)]
    event Approval(address indexed owner, address indexed spender, uint256 value);
}

const TOKEN: Address = Address::repeat_byte(0x42);
const ALICE: Address = Address::repeat_byte(0x0a);
const BOB: Address = Address::repeat_byte(0x0b);
const CAROL: Address = Address::repeat_byte(0x0c);
const DAN: Address = Address::repeat_byte(0x0d);

fn mocked(asserter: &Asserter) -> RootProvider<Ethereum> {
    RootProvider::new(RpcClient::mocked(asserter.clone()))
}

fn fetcher(asserter: &Asserter, config: EnricherConfig) -> TokenFetcher {
    TokenFetcher::new(mocked(asserter), vec![TOKEN], config, "testnet")
}

fn transfer_log(block: u64, from: Address, to: Address, amount: u64) -> Log {
    let event = Transfer { from, to, value: U256::from(amount) };
    Log {
        inner: alloy::primitives::Log { address: TOKEN, data: event.encode_log_data() },
        block_number: Some(block),
        ..Default::default()
    }
}

fn approval_log(block: u64, owner: Address, spender: Address, amount: u64) -> Log {
    let event = Approval { owner, spender, value: U256::from(amount) };
    Log {
        inner: alloy::primitives::Log { address: TOKEN, data: event.encode_log_data() },
        block_number: Some(block),
        ..Default::default()
    }
}

fn push_head(asserter: &Asserter, head: u64) {
    asserter.push_success(&U64::from(head));
}

fn push_total_supply(asserter: &Asserter, supply: u64) {
    let word = B256::from(U256::from(supply));
    asserter.push_success(&Bytes::copy_from_slice(word.as_slice()));
}

#[tokio::test]
async fn transfer_records_both_participants() -> anyhow::Result<()> {
    let asserter = Asserter::new();
    push_head(&asserter, 100);
    asserter.push_success(&vec![transfer_log(5, ALICE, BOB, 1_000)]);

    let events = fetcher(&asserter, EnricherConfig::default())
        .fetch(Some(DisconnectedRange::from_block(0)))
        .await?;

    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.block_number, 5);
    assert_eq!(event.exclude_addresses, vec![ALICE]);
    assert_eq!(event.include_addresses, Some(vec![ALICE, BOB]));
    match &event.data {
        EventPayload::Token(TokenEvent::Transfer { token, from, to, amount }) => {
            assert_eq!(*token, TOKEN);
            assert_eq!(*from, ALICE);
            assert_eq!(*to, BOB);
            assert_eq!(*amount, U256::from(1_000u64));
        }
        other => panic!("unexpected payload: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn supply_threshold_suppresses_dust_transfers() -> anyhow::Result<()> {
    let asserter = Asserter::new();
    push_head(&asserter, 100);
    asserter.push_success(&vec![
        transfer_log(5, ALICE, BOB, 500),
        transfer_log(6, ALICE, BOB, 5_000),
    ]);
    // One totalSupply() read per candidate transfer; supply 1_000_000 at
    // 1_000 permill puts the threshold at 1_000.
    push_total_supply(&asserter, 1_000_000);
    push_total_supply(&asserter, 1_000_000);

    let config =
        EnricherConfig { transfer_threshold_permill: Some(1_000), ..EnricherConfig::default() };
    let events = fetcher(&asserter, config).fetch(Some(DisconnectedRange::from_block(0))).await?;

    let blocks: Vec<u64> = events.iter().map(|event| event.block_number).collect();
    assert_eq!(blocks, vec![6], "the 500-unit transfer is below the threshold");
    Ok(())
}

#[tokio::test]
async fn approvals_need_no_supply_read() -> anyhow::Result<()> {
    let asserter = Asserter::new();
    push_head(&asserter, 100);
    asserter.push_success(&vec![approval_log(7, CAROL, DAN, 9_000)]);

    // A threshold is configured, but approvals never consult it; no
    // totalSupply response is queued and the fetch must still succeed.
    let config =
        EnricherConfig { transfer_threshold_permill: Some(1_000), ..EnricherConfig::default() };
    let events = fetcher(&asserter, config).fetch(Some(DisconnectedRange::from_block(0))).await?;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].exclude_addresses, vec![CAROL]);
    assert_eq!(events[0].include_addresses, Some(vec![CAROL, DAN]));
    Ok(())
}

#[tokio::test]
async fn fetch_one_returns_events_involving_the_address() -> anyhow::Result<()> {
    let asserter = Asserter::new();
    push_head(&asserter, 100);
    asserter.push_success(&vec![
        transfer_log(5, ALICE, BOB, 1_000),
        approval_log(6, CAROL, DAN, 2_000),
    ]);

    let events =
        fetcher(&asserter, EnricherConfig::default()).fetch_one(&BOB.to_string()).await?;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].block_number, 5);
    Ok(())
}
