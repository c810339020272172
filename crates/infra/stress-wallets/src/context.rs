//! Test seed and the read-only per-run context.

use std::{fmt, str::FromStr};

use serde::Serialize;
use tracing::Span;

use crate::error::FundingError;

/// Isolation domain of a test run.
///
/// Seed `0` selects the shared root faucet. Every other value selects its own
/// derived sub-faucet and worker namespace, so two runs with distinct seeds
/// never send from the same address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TestSeed(u64);

impl TestSeed {
    /// The seed that selects the root faucet.
    pub const ROOT: Self = Self(0);

    /// Wraps a raw seed value.
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Whether this seed selects the root faucet.
    pub const fn is_root(self) -> bool {
        self.0 == 0
    }

    /// Lowercase hex form, used as the worker-pool generation seed.
    pub fn to_hex(self) -> String {
        format!("{:x}", self.0)
    }
}

impl From<u64> for TestSeed {
    fn from(seed: u64) -> Self {
        Self(seed)
    }
}

impl fmt::Display for TestSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TestSeed {
    type Err = FundingError;

    /// Accepts a decimal integer or a `0x`-prefixed hex integer.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => trimmed.parse::<u64>(),
        };
        parsed.map(Self).map_err(|e| FundingError::InvalidSeed(format!("{s:?}: {e}")))
    }
}

/// Read-only context shared with every initializer and engine callback of a run.
///
/// Created once at run start and never mutated afterwards. The span is the
/// run's log sink; work done on behalf of the run is recorded under it.
#[derive(Debug, Clone, Serialize)]
pub struct TestContext {
    /// Seed of the run.
    pub seed: TestSeed,
    /// Gas price in wei used for every transaction of the run.
    pub gas_price: u128,
    /// Log sink for the run.
    #[serde(skip)]
    pub span: Span,
}

impl TestContext {
    /// Creates a context with a fresh `stress_test` span tagged with the seed.
    pub fn new(seed: TestSeed, gas_price: u128) -> Self {
        let span = tracing::info_span!("stress_test", seed = seed.get());
        Self { seed, gas_price, span }
    }
}
