//! Per-worker initializers handed to the load engine.
//!
//! The orchestrator runs them over the whole pool during preparation, one
//! initializer at a time. The engine receives the same list and may run them
//! again for a worker at times of its choosing, as long as each completes
//! before that worker sends traffic.

use std::{fmt, sync::Arc};

use alloy_primitives::U256;
use async_trait::async_trait;

use crate::{
    account::Account,
    context::TestContext,
    error::FundingError,
    faucet::Faucet,
    network::NetworkClient,
    nonce::init_hot_nonce,
};

/// A step that prepares one worker before it is used.
#[async_trait]
pub trait WorkerInit: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Prepares the worker at pool position `index`.
    async fn init(
        &self,
        client: &dyn NetworkClient,
        index: usize,
        worker: &Account,
        ctx: &TestContext,
    ) -> Result<(), FundingError>;
}

/// Sends the run's funding amount from the faucet to the worker.
///
/// A failed transfer reports no funded count, since the engine may fund
/// workers in any order.
#[derive(Debug, Clone)]
pub struct FundWallet {
    faucet: Arc<Faucet>,
    amount: U256,
}

impl FundWallet {
    /// Creates the initializer; the faucet's hot nonce must already be set.
    pub const fn new(faucet: Arc<Faucet>, amount: U256) -> Self {
        Self { faucet, amount }
    }

    /// Amount sent to each worker.
    pub const fn amount(&self) -> U256 {
        self.amount
    }
}

#[async_trait]
impl WorkerInit for FundWallet {
    fn name(&self) -> &'static str {
        "fund_wallet"
    }

    async fn init(
        &self,
        client: &dyn NetworkClient,
        index: usize,
        worker: &Account,
        _ctx: &TestContext,
    ) -> Result<(), FundingError> {
        self.faucet.fund_wallet(client, index, worker.address(), self.amount).await.map(|_| ())
    }
}

/// Seeds the worker's hot nonce from the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct InitHotNonce;

#[async_trait]
impl WorkerInit for InitHotNonce {
    fn name(&self) -> &'static str {
        "init_hot_nonce"
    }

    async fn init(
        &self,
        client: &dyn NetworkClient,
        _index: usize,
        worker: &Account,
        _ctx: &TestContext,
    ) -> Result<(), FundingError> {
        init_hot_nonce(client, worker).await.map(|_| ())
    }
}

/// The standard initializer list: fund, then bootstrap the nonce.
pub fn standard_initializers(faucet: Arc<Faucet>, amount: U256) -> Vec<Arc<dyn WorkerInit>> {
    vec![Arc::new(FundWallet::new(faucet, amount)), Arc::new(InitHotNonce)]
}
