//! Error types for wallet preparation.

use alloy_primitives::{Address, U256};
use thiserror::Error;

use crate::{faucet::FaucetData, network::NetworkError, orchestrator::PrepareState};

/// Errors raised while deriving, sizing, funding or bootstrapping wallets.
#[derive(Debug, Error)]
pub enum FundingError {
    /// The test seed could not be parsed or is out of range.
    #[error("invalid test seed: {0}")]
    InvalidSeed(String),

    /// A configuration value violates its constraints.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The network client failed while serving a request for `account`.
    #[error("network unavailable for {account}: {source}")]
    NetworkUnavailable {
        /// Account the request was made for.
        account: Address,
        /// Underlying client error.
        #[source]
        source: NetworkError,
    },

    /// The faucet cannot cover every disbursement plus its transfer fees.
    #[error("faucet {faucet} has {available} wei, needs {required} wei")]
    InsufficientFaucetBalance {
        /// Faucet address.
        faucet: Address,
        /// Total wei required for the disbursement.
        required: U256,
        /// Balance reported by the network.
        available: U256,
    },

    /// A funding transaction failed.
    #[error("funding worker {index} ({worker}) failed{}: {source}", funded_prefix(.funded))]
    PartialDisbursementFailure {
        /// Pool index of the worker whose funding failed.
        index: usize,
        /// Address of that worker.
        worker: Address,
        /// Number of workers funded before the failure. Only known when the
        /// workers are funded in pool order, as during preparation.
        funded: Option<usize>,
        /// Underlying client error.
        #[source]
        source: NetworkError,
    },

    /// An account was asked for a nonce before its hot nonce was initialised.
    #[error("hot nonce for {0} is not initialised")]
    NonceNotInitialized(Address),
}

impl FundingError {
    /// Wraps a network error raised on behalf of `account`.
    pub const fn network(account: Address, source: NetworkError) -> Self {
        Self::NetworkUnavailable { account, source }
    }

    /// Records that `count` workers were funded in order before a disbursement
    /// failure. Other errors are returned unchanged.
    pub fn with_funded(self, count: usize) -> Self {
        match self {
            Self::PartialDisbursementFailure { index, worker, source, .. } => {
                Self::PartialDisbursementFailure { index, worker, funded: Some(count), source }
            }
            other => other,
        }
    }
}

/// A preparation run that stopped before reaching [`PrepareState::Ready`].
///
/// Carries everything needed to report partial progress: the last state that
/// completed, the account index that failed, the faucet data once funding was
/// sized and the workers that were already funded. Funding is never rolled back.
#[derive(Debug, Error)]
#[error("wallet preparation failed after {state}{}: {source}", at_index(.index))]
pub struct PrepareError {
    /// Last state reached before the failure.
    pub state: PrepareState,
    /// Index of the failing worker, if the failure is worker-specific.
    pub index: Option<usize>,
    /// Faucet data, present once the funding amount was computed.
    pub faucet_data: Option<FaucetData>,
    /// Workers that received their funding transaction.
    pub funded: Vec<Address>,
    /// The failure itself.
    #[source]
    pub source: FundingError,
}

impl PrepareError {
    /// Creates an error with no partial progress attached.
    pub const fn at(state: PrepareState, source: FundingError) -> Self {
        Self { state, index: None, faucet_data: None, funded: Vec::new(), source }
    }
}

fn funded_prefix(funded: &Option<usize>) -> String {
    funded.map(|n| format!(" after {n} workers were funded")).unwrap_or_default()
}

fn at_index(index: &Option<usize>) -> String {
    index.map(|i| format!(" at account {i}")).unwrap_or_default()
}

/// Errors from a complete stress-test run.
#[derive(Debug, Error)]
pub enum StressTestError {
    /// Wallet preparation failed; no load traffic was generated.
    #[error(transparent)]
    Prepare(#[from] PrepareError),

    /// The load engine failed during setup or while generating load.
    #[error("load engine failed: {0}")]
    Engine(#[source] Box<dyn std::error::Error + Send + Sync>),
}
