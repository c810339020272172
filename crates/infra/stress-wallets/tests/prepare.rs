//! Wallet preparation against an in-memory chain.

mod common;

use std::sync::Arc;

use alloy_primitives::{U256, address};
use common::{ANVIL_KEY_0, MockChain, rich};
use stress_wallets::{
    FUNDING_MARGIN, FundingError, NetworkClient, PrepareError, PrepareState, PreparedPool,
    StressConfig, TestProfile, TestSeed, WalletFunder, derive_faucet_signer, derive_pool,
};

const GAS_PRICE: u128 = 1;

fn config(seed: u64, n_calls: u64, max_n_wallets: u64) -> StressConfig {
    StressConfig {
        seed: TestSeed::new(seed),
        n_calls,
        max_n_wallets,
        gas_price: GAS_PRICE,
        ..Default::default()
    }
}

fn funded_chain(seed: u64) -> Arc<MockChain> {
    let chain = Arc::new(MockChain::new(GAS_PRICE));
    chain.fund(derive_faucet_signer(TestSeed::new(seed)).unwrap().address(), rich());
    chain
}

async fn prepare(
    chain: &Arc<MockChain>,
    config: &StressConfig,
) -> Result<PreparedPool, PrepareError> {
    let client: Arc<dyn NetworkClient> = chain.clone();
    WalletFunder::new(client, TestProfile::transfers())
        .prepare(config, &config.test_context())
        .await
}

#[tokio::test]
async fn derived_seed_funds_pool_in_order_with_consecutive_nonces() {
    let chain = funded_chain(7);
    let faucet = derive_faucet_signer(TestSeed::new(7)).unwrap().address();
    chain.set_nonce(faucet, 5);

    let prepared = prepare(&chain, &config(7, 10, 4)).await.unwrap();

    // ceil(10 / 4) = 3 calls per worker at 21000 gas and 1 wei
    let expected_funding = FUNDING_MARGIN + U256::from(3 * 21_000);
    assert_eq!(prepared.faucet_data.address, faucet);
    assert_eq!(prepared.faucet_data.n_wallets, 4);
    assert_eq!(prepared.faucet_data.funding_per_wallet, expected_funding);

    let workers = prepared.pool.addresses();
    assert_eq!(workers, derive_pool(TestSeed::new(7), 4).addresses());

    let sent = chain.sent_from(faucet);
    assert_eq!(sent.len(), 4);
    for (i, tx) in sent.iter().enumerate() {
        assert_eq!(tx.nonce, 5 + i as u64);
        assert_eq!(tx.to, workers[i]);
        assert_eq!(tx.value, expected_funding);
        assert_eq!(chain.balance(workers[i]), expected_funding);
    }
    assert_eq!(prepared.faucet.account().peek_nonce(), Some(9));
}

#[tokio::test]
async fn workers_start_from_network_transaction_count() {
    let chain = funded_chain(3);
    let pool = derive_pool(TestSeed::new(3), 3).addresses();
    chain.set_nonce(pool[1], 12);

    let prepared = prepare(&chain, &config(3, 3, 3)).await.unwrap();

    let worker = prepared.pool.worker(1).unwrap();
    assert_eq!(worker.next_nonce().unwrap(), 12);
    assert_eq!(worker.next_nonce().unwrap(), 13);
    assert_eq!(prepared.pool.worker(0).unwrap().next_nonce().unwrap(), 0);
    assert!(prepared.pool.iter().all(|w| w.is_hot()));
}

#[tokio::test]
async fn wallet_count_is_capped_by_max_wallets() {
    let chain = funded_chain(11);
    let prepared = prepare(&chain, &config(11, 1000, 50)).await.unwrap();

    assert_eq!(prepared.pool.len(), 50);
    assert_eq!(prepared.faucet_data.n_wallets, 50);
    assert_eq!(
        prepared.faucet_data.funding_per_wallet,
        FUNDING_MARGIN + U256::from(20 * 21_000)
    );
    assert_eq!(chain.sent().len(), 50);
}

#[tokio::test]
async fn wallet_count_is_capped_by_calls() {
    let chain = funded_chain(12);
    let prepared = prepare(&chain, &config(12, 10, 50)).await.unwrap();
    assert_eq!(prepared.pool.len(), 10);
    assert_eq!(chain.sent().len(), 10);
}

#[tokio::test]
async fn root_seed_funds_from_operator_key() {
    let chain = Arc::new(MockChain::new(GAS_PRICE));
    let root = address!("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    chain.fund(root, rich());

    let config = StressConfig {
        faucet_private_key: Some(ANVIL_KEY_0.parse().unwrap()),
        ..config(0, 4, 2)
    };
    let prepared = prepare(&chain, &config).await.unwrap();

    assert_eq!(prepared.faucet_data.address, root);
    assert!(prepared.faucet.source().is_root());
    assert_eq!(chain.sent_from(root).len(), 2);
}

#[tokio::test]
async fn root_seed_without_key_fails_before_touching_the_network() {
    let chain = Arc::new(MockChain::new(GAS_PRICE));
    let err = prepare(&chain, &config(0, 4, 2)).await.unwrap_err();

    assert_eq!(err.state, PrepareState::Init);
    assert!(matches!(err.source, FundingError::InvalidConfig(_)));
    assert!(chain.count_queries().is_empty());
    assert!(chain.sent().is_empty());
}

#[tokio::test]
async fn unreachable_network_fails_faucet_nonce_bootstrap() {
    let chain = funded_chain(4);
    chain.set_offline(true);

    let err = prepare(&chain, &config(4, 10, 5)).await.unwrap_err();

    assert_eq!(err.state, PrepareState::FaucetResolved);
    assert!(err.faucet_data.is_none());
    assert!(err.funded.is_empty());
    assert!(matches!(
        err.source,
        FundingError::NetworkUnavailable { account, .. }
            if account == derive_faucet_signer(TestSeed::new(4)).unwrap().address()
    ));
}

#[tokio::test]
async fn insufficient_faucet_balance_sends_nothing() {
    let chain = Arc::new(MockChain::new(GAS_PRICE));
    let faucet = derive_faucet_signer(TestSeed::new(5)).unwrap().address();
    chain.fund(faucet, U256::from(1_000u64));

    let err = prepare(&chain, &config(5, 10, 5)).await.unwrap_err();

    assert_eq!(err.state, PrepareState::FundingSized);
    assert!(err.funded.is_empty());
    assert!(err.faucet_data.is_some());
    match err.source {
        FundingError::InsufficientFaucetBalance { faucet: f, required, available } => {
            assert_eq!(f, faucet);
            assert_eq!(available, U256::from(1_000u64));
            let per_wallet = FUNDING_MARGIN + U256::from(2 * 21_000);
            assert_eq!(required, (per_wallet + U256::from(21_000)) * U256::from(5));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(chain.sent().is_empty());
}

#[tokio::test]
async fn failed_disbursement_reports_funded_prefix() {
    let chain = funded_chain(6);
    let pool = derive_pool(TestSeed::new(6), 5).addresses();
    chain.fail_transfers_to(pool[2]);

    let err = prepare(&chain, &config(6, 5, 5)).await.unwrap_err();

    assert_eq!(err.state, PrepareState::FundingSized);
    assert_eq!(err.index, Some(2));
    assert_eq!(err.funded, pool[..2].to_vec());
    assert_eq!(err.faucet_data.as_ref().map(|d| d.n_wallets), Some(5));
    assert!(matches!(
        err.source,
        FundingError::PartialDisbursementFailure { index: 2, funded: Some(2), worker, .. }
            if worker == pool[2]
    ));
    assert_eq!(chain.sent().len(), 2);
    assert!(chain.count_queries().iter().all(|a| !pool.contains(a)));
}

#[tokio::test]
async fn worker_nonce_failure_stops_remaining_workers() {
    let chain = funded_chain(8);
    let pool = derive_pool(TestSeed::new(8), 4).addresses();
    chain.fail_count_for(pool[1]);

    let err = prepare(&chain, &config(8, 4, 4)).await.unwrap_err();

    assert_eq!(err.state, PrepareState::Disbursed);
    assert_eq!(err.index, Some(1));
    assert_eq!(err.funded, pool);
    assert!(matches!(
        err.source,
        FundingError::NetworkUnavailable { account, .. } if account == pool[1]
    ));

    let queried = chain.count_queries();
    assert!(queried.contains(&pool[0]));
    assert!(!queried.contains(&pool[2]));
    assert!(!queried.contains(&pool[3]));
}

#[tokio::test]
async fn error_report_names_stage_and_index_but_not_the_key() {
    let chain = Arc::new(MockChain::new(GAS_PRICE));
    let root = address!("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    chain.fund(root, rich());
    let pool = derive_pool(TestSeed::ROOT, 3).addresses();
    chain.fail_transfers_to(pool[1]);

    let config = StressConfig {
        faucet_private_key: Some(ANVIL_KEY_0.parse().unwrap()),
        ..config(0, 3, 3)
    };
    let err = prepare(&chain, &config).await.unwrap_err();

    let rendered = format!("{err} {err:?}");
    assert!(rendered.contains("FUNDING_SIZED"));
    assert!(rendered.contains("at account 1"));
    assert!(!rendered.contains(ANVIL_KEY_0.trim_start_matches("0x")));
}

#[tokio::test]
async fn same_seed_on_fresh_chains_derives_identical_accounts() {
    let first = prepare(&funded_chain(21), &config(21, 6, 3)).await.unwrap();
    let second = prepare(&funded_chain(21), &config(21, 6, 3)).await.unwrap();

    assert_eq!(first.pool.addresses(), second.pool.addresses());
    assert_eq!(first.faucet_data, second.faucet_data);
}

#[tokio::test]
async fn same_seed_on_live_chain_never_reuses_nonces() {
    let chain = funded_chain(22);
    let faucet = derive_faucet_signer(TestSeed::new(22)).unwrap().address();

    let first = prepare(&chain, &config(22, 3, 3)).await.unwrap();
    let second = prepare(&chain, &config(22, 3, 3)).await.unwrap();

    let nonces: Vec<u64> = chain.sent_from(faucet).iter().map(|tx| tx.nonce).collect();
    assert_eq!(nonces, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(first.faucet.account().peek_nonce(), Some(3));
    assert_eq!(second.faucet.account().peek_nonce(), Some(6));
}

#[tokio::test]
async fn concurrent_runs_with_distinct_seeds_do_not_collide() {
    let chain = Arc::new(MockChain::new(GAS_PRICE));
    for seed in [31, 32] {
        chain.fund(derive_faucet_signer(TestSeed::new(seed)).unwrap().address(), rich());
    }

    let (first, second) = (config(31, 8, 4), config(32, 8, 4));
    let (a, b) = tokio::join!(prepare(&chain, &first), prepare(&chain, &second));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a.faucet_data.address, b.faucet_data.address);
    let a_workers = a.pool.addresses();
    assert!(b.pool.addresses().iter().all(|w| !a_workers.contains(w)));

    for faucet in [a.faucet_data.address, b.faucet_data.address] {
        let nonces: Vec<u64> = chain.sent_from(faucet).iter().map(|tx| tx.nonce).collect();
        assert_eq!(nonces, vec![0, 1, 2, 3]);
    }
}

#[tokio::test]
async fn mismatched_context_is_rejected() {
    let chain = funded_chain(9);
    let config = config(9, 4, 2);
    let other = StressConfig { seed: TestSeed::new(10), ..config.clone() }.test_context();

    let client: Arc<dyn NetworkClient> = chain.clone();
    let err = WalletFunder::new(client, TestProfile::transfers())
        .prepare(&config, &other)
        .await
        .unwrap_err();

    assert_eq!(err.state, PrepareState::Init);
    assert!(matches!(err.source, FundingError::InvalidConfig(_)));
}
