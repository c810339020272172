//! Worker funding size.

use alloy_primitives::U256;

use crate::error::FundingError;

/// Fixed safety margin in wei added to every worker's funding, covering
/// auxiliary costs the per-call estimate does not see (e.g. L1 data fees).
pub const FUNDING_MARGIN: U256 = U256::from_limbs([1_000_000_000_000, 0, 0, 0]);

/// Number of workers for a run: `min(n_calls, max_n_wallets)`.
pub fn n_wallets(n_calls: u64, max_n_wallets: u64) -> Result<usize, FundingError> {
    if n_calls == 0 {
        return Err(FundingError::InvalidConfig("n_calls must be at least 1".into()));
    }
    if max_n_wallets == 0 {
        return Err(FundingError::InvalidConfig("max_n_wallets must be at least 1".into()));
    }
    usize::try_from(n_calls.min(max_n_wallets))
        .map_err(|_| FundingError::InvalidConfig("wallet count does not fit in memory".into()))
}

/// Inputs of the funding computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FundingParams {
    /// Total calls of the run.
    pub n_calls: u64,
    /// Workers sharing the calls.
    pub n_wallets: u64,
    /// Gas limit of a single call.
    pub gas_limit: u64,
    /// Gas price in wei.
    pub gas_price: u128,
    /// Fixed auxiliary cost per worker in wei.
    pub tx_cost: U256,
}

impl FundingParams {
    /// Worst-case number of calls any single worker is assigned.
    pub const fn calls_per_wallet(&self) -> u64 {
        self.n_calls.div_ceil(self.n_wallets)
    }

    /// Amount every worker must receive:
    /// `margin + ceil(n_calls / n_wallets) * gas_limit * gas_price + tx_cost`.
    ///
    /// Computed in 256-bit integers; any overflow is reported rather than wrapped.
    pub fn wallet_funding(&self) -> Result<U256, FundingError> {
        if self.n_calls == 0 || self.n_wallets == 0 {
            return Err(FundingError::InvalidConfig(
                "funding needs at least one call and one wallet".into(),
            ));
        }
        if self.n_wallets > self.n_calls {
            return Err(FundingError::InvalidConfig(format!(
                "{} wallets exceed {} calls",
                self.n_wallets, self.n_calls
            )));
        }
        if self.gas_limit == 0 {
            return Err(FundingError::InvalidConfig("gas_limit must be positive".into()));
        }

        U256::from(self.calls_per_wallet())
            .checked_mul(U256::from(self.gas_limit))
            .and_then(|gas| gas.checked_mul(U256::from(self.gas_price)))
            .and_then(|fees| fees.checked_add(FUNDING_MARGIN))
            .and_then(|amount| amount.checked_add(self.tx_cost))
            .ok_or_else(|| FundingError::InvalidConfig("wallet funding overflows 256 bits".into()))
    }
}
