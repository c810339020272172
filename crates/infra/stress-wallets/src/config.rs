//! Run configuration.

use alloy_primitives::U256;
use clap::Args;
use serde::Serialize;
use tracing::warn;
use url::Url;

use crate::{
    context::{TestContext, TestSeed},
    derive::RootCredential,
    error::FundingError,
    funding::n_wallets,
};

/// Options recognised by wallet preparation, validated once at entry.
#[derive(Debug, Clone, Args, Serialize)]
pub struct StressConfig {
    /// Test seed. 0 uses the root faucet, any other value a derived sub-faucet
    #[arg(long, env = "STRESS_SEED", default_value = "0")]
    pub seed: TestSeed,

    /// Total number of calls the load test will issue
    #[arg(long, default_value_t = 100)]
    pub n_calls: u64,

    /// Upper bound on the number of worker wallets
    #[arg(long, default_value_t = 50)]
    pub max_n_wallets: u64,

    /// Gas price in wei
    #[arg(long, env = "GAS_PRICE", default_value_t = 1_000_000_000)]
    pub gas_price: u128,

    #[command(flatten)]
    pub network: NetworkConfig,

    /// Root faucet private key, required with seed 0
    #[arg(long, env = "FAUCET_PRIVATE_KEY", hide_env_values = true)]
    #[serde(skip)]
    pub faucet_private_key: Option<RootCredential>,

    /// Issue calls from different workers concurrently
    #[arg(long = "async")]
    #[serde(rename = "async")]
    pub async_calls: bool,

    /// Delay between calls in milliseconds when running serially
    #[arg(long, default_value_t = 0)]
    pub call_delay_ms: u64,
}

/// Network endpoint options.
#[derive(Debug, Clone, Args, Serialize)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint of the network under test
    #[arg(long, env = "RPC_URL", default_value = "http://localhost:8545")]
    pub rpc_url: Url,

    /// Expected chain id; checked against the endpoint when set
    #[arg(long, env = "CHAIN_ID")]
    pub chain_id: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: Url::parse("http://localhost:8545").expect("static url is valid"),
            chain_id: None,
        }
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            seed: TestSeed::ROOT,
            n_calls: 100,
            max_n_wallets: 50,
            gas_price: 1_000_000_000,
            network: NetworkConfig::default(),
            faucet_private_key: None,
            async_calls: false,
            call_delay_ms: 0,
        }
    }
}

impl StressConfig {
    /// Checks every constraint and returns the wallet count of the run.
    pub fn validate(&self) -> Result<usize, FundingError> {
        let n_wallets = n_wallets(self.n_calls, self.max_n_wallets)?;
        if self.seed.is_root() && self.faucet_private_key.is_none() {
            return Err(FundingError::InvalidConfig("seed 0 requires a faucet private key".into()));
        }
        if !self.seed.is_root() && self.faucet_private_key.is_some() {
            warn!(seed = %self.seed, "Faucet private key is ignored for derived sub-faucets");
        }
        Ok(n_wallets)
    }

    /// Returns a copy with the faucet credential cleared.
    pub fn redacted(&self) -> Self {
        Self { faucet_private_key: None, ..self.clone() }
    }

    /// Builds the read-only context of a run using this configuration.
    pub fn test_context(&self) -> TestContext {
        TestContext::new(self.seed, self.gas_price)
    }
}

/// Per-test constants that size worker funding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestProfile {
    /// Gas limit of one call.
    pub gas_limit: u64,
    /// Fixed auxiliary cost per worker in wei, e.g. a settlement-layer surcharge.
    pub tx_cost: U256,
}

impl TestProfile {
    /// A profile for plain value transfers with no auxiliary cost.
    pub const fn transfers() -> Self {
        Self { gas_limit: 21_000, tx_cost: U256::ZERO }
    }
}
