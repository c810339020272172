//! Wallet funding orchestration.
//!
//! Preparation walks a strictly sequential state machine:
//!
//! ```text
//! Init -> FaucetResolved -> FaucetNonceReady -> FundingSized
//!      -> Disbursed -> WorkerNoncesReady -> Ready
//! ```
//!
//! Each step depends on the previous one: funding depends on the wallet count,
//! disbursement needs a hot faucet nonce, and no worker is handed out before
//! its own hot nonce is set. Any failure stops the walk and is returned as a
//! [`PrepareError`] recording how far it got.

use std::{fmt, sync::Arc};

use alloy_primitives::Address;
use serde::Serialize;
use tracing::{Instrument, debug, info, warn};

use crate::{
    account::WalletPool,
    config::{StressConfig, TestProfile},
    context::TestContext,
    derive::derive_pool,
    error::{FundingError, PrepareError},
    faucet::{Faucet, FaucetData},
    funding::FundingParams,
    init::{FundWallet, InitHotNonce, WorkerInit},
    network::NetworkClient,
};

/// Progress of a preparation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrepareState {
    /// Nothing done yet.
    Init,
    /// Faucet and worker accounts derived.
    FaucetResolved,
    /// Faucet hot nonce set.
    FaucetNonceReady,
    /// Funding amount computed.
    FundingSized,
    /// Every worker funded.
    Disbursed,
    /// Every worker's hot nonce set.
    WorkerNoncesReady,
    /// Pool ready for load generation.
    Ready,
}

impl fmt::Display for PrepareState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::FaucetResolved => "FAUCET_RESOLVED",
            Self::FaucetNonceReady => "FAUCET_NONCE_READY",
            Self::FundingSized => "FUNDING_SIZED",
            Self::Disbursed => "DISBURSED",
            Self::WorkerNoncesReady => "WORKER_NONCES_READY",
            Self::Ready => "READY",
        };
        f.write_str(name)
    }
}

/// A funded pool whose workers all hold hot nonces.
#[derive(Debug)]
pub struct PreparedPool {
    /// Worker accounts in pool order.
    pub pool: Arc<WalletPool>,
    /// Faucet that funded the pool.
    pub faucet: Arc<Faucet>,
    /// Report artifact for the run.
    pub faucet_data: FaucetData,
    /// Initializers the load engine may re-run per worker.
    pub initializers: Vec<Arc<dyn WorkerInit>>,
}

/// Prepares the wallet pool of a run.
#[derive(Debug, Clone)]
pub struct WalletFunder {
    client: Arc<dyn NetworkClient>,
    profile: TestProfile,
}

impl WalletFunder {
    /// Creates a funder using `client` and the per-test `profile`.
    pub fn new(client: Arc<dyn NetworkClient>, profile: TestProfile) -> Self {
        Self { client, profile }
    }

    /// Returns the network client.
    pub fn client(&self) -> &Arc<dyn NetworkClient> {
        &self.client
    }

    /// Runs the full preparation sequence and returns only once every worker is
    /// funded and holds a hot nonce.
    pub async fn prepare(
        &self,
        config: &StressConfig,
        ctx: &TestContext,
    ) -> Result<PreparedPool, PrepareError> {
        self.run(config, ctx).instrument(ctx.span.clone()).await.inspect_err(|err| {
            warn!(
                state = %err.state,
                index = ?err.index,
                funded = err.funded.len(),
                error = %err.source,
                "Wallet preparation failed"
            );
        })
    }

    async fn run(
        &self,
        config: &StressConfig,
        ctx: &TestContext,
    ) -> Result<PreparedPool, PrepareError> {
        let client = self.client.as_ref();
        let mut state = PrepareState::Init;

        let n_wallets = config.validate().map_err(|e| PrepareError::at(state, e))?;
        if config.seed != ctx.seed || config.gas_price != ctx.gas_price {
            return Err(PrepareError::at(
                state,
                FundingError::InvalidConfig("test context does not match the configuration".into()),
            ));
        }

        let faucet = Faucet::resolve(ctx.seed, config.faucet_private_key.as_ref())
            .map(Arc::new)
            .map_err(|e| PrepareError::at(state, e))?;
        let pool = derive_pool(ctx.seed, n_wallets);
        state = advance(state, PrepareState::FaucetResolved);
        info!(
            faucet = %faucet.address(),
            root = faucet.source().is_root(),
            n_wallets,
            "Faucet resolved"
        );

        faucet.init_hot_nonce(client).await.map_err(|e| PrepareError::at(state, e))?;
        state = advance(state, PrepareState::FaucetNonceReady);

        let funding_per_wallet = FundingParams {
            n_calls: config.n_calls,
            n_wallets: n_wallets as u64,
            gas_limit: self.profile.gas_limit,
            gas_price: ctx.gas_price,
            tx_cost: self.profile.tx_cost,
        }
        .wallet_funding()
        .map_err(|e| PrepareError::at(state, e))?;
        let faucet_data =
            FaucetData { address: faucet.address(), funding_per_wallet, n_wallets };
        state = advance(state, PrepareState::FundingSized);
        info!(%funding_per_wallet, n_wallets, "Funding sized");

        let fail = |state: PrepareState,
                    index: Option<usize>,
                    funded: usize,
                    source: FundingError| PrepareError {
            state,
            index,
            faucet_data: Some(faucet_data.clone()),
            funded: pool.iter().take(funded).map(|w| w.address()).collect::<Vec<Address>>(),
            source,
        };

        faucet
            .ensure_balance(client, funding_per_wallet, n_wallets, ctx.gas_price)
            .await
            .map_err(|e| fail(state, None, 0, e))?;

        let fund_wallet = FundWallet::new(Arc::clone(&faucet), funding_per_wallet);
        run_over_pool(&fund_wallet, client, &pool, ctx)
            .await
            .map_err(|(index, e)| fail(state, Some(index), index, e.with_funded(index)))?;
        state = advance(state, PrepareState::Disbursed);

        run_over_pool(&InitHotNonce, client, &pool, ctx)
            .await
            .map_err(|(index, e)| fail(state, Some(index), pool.len(), e))?;
        state = advance(state, PrepareState::WorkerNoncesReady);

        advance(state, PrepareState::Ready);
        info!(faucet = %faucet.address(), n_wallets, "Wallet pool ready");

        Ok(PreparedPool {
            pool: Arc::new(pool),
            faucet: Arc::clone(&faucet),
            faucet_data,
            initializers: vec![Arc::new(fund_wallet), Arc::new(InitHotNonce)],
        })
    }
}

fn advance(from: PrepareState, to: PrepareState) -> PrepareState {
    debug_assert!(from < to, "preparation must move forward");
    debug!(%from, %to, "Preparation state change");
    to
}

/// Runs `init` over every worker in pool order, stopping at the first failure.
async fn run_over_pool(
    init: &dyn WorkerInit,
    client: &dyn NetworkClient,
    pool: &WalletPool,
    ctx: &TestContext,
) -> Result<(), (usize, FundingError)> {
    for (index, worker) in pool.iter().enumerate() {
        init.init(client, index, worker, ctx).await.map_err(|e| (index, e))?;
    }
    debug!(step = init.name(), workers = pool.len(), "Initializer applied to pool");
    Ok(())
}
