//! Seeded key derivation for faucets and worker wallets.
//!
//! Keys are `keccak256(DOMAIN || role || seed || index || attempt)`, with the
//! big-endian `attempt` counter bumped in the negligible case that a digest is
//! not a valid secp256k1 scalar. Equal inputs always yield the same key, and
//! distinct seeds yield unrelated keys.

use std::{fmt, str::FromStr};

use alloy_primitives::{B256, Keccak256};
use alloy_signer_local::PrivateKeySigner;

use crate::{
    account::{Account, AccountRole, WalletPool},
    context::TestSeed,
    error::FundingError,
};

/// Domain separator mixed into every derived key.
const DOMAIN: &[u8] = b"stress-wallets/v1";

const FAUCET_TAG: u8 = 0x00;
const WORKER_TAG: u8 = 0x01;

/// Statically supplied operator key of the root faucet.
///
/// Never printed: `Debug` is redacted and the type has no `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct RootCredential(B256);

impl RootCredential {
    /// Wraps raw key bytes.
    pub const fn new(key: B256) -> Self {
        Self(key)
    }

    /// Builds the root faucet signer.
    pub fn signer(&self) -> Result<PrivateKeySigner, FundingError> {
        PrivateKeySigner::from_bytes(&self.0).map_err(|_| {
            FundingError::InvalidConfig("faucet private key is not a valid secp256k1 key".into())
        })
    }
}

impl fmt::Debug for RootCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RootCredential(<redacted>)")
    }
}

impl FromStr for RootCredential {
    type Err = FundingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The input is deliberately left out of the message.
        let key = s.trim().parse::<B256>().map_err(|_| {
            FundingError::InvalidConfig("faucet private key must be 32 hex bytes".into())
        })?;
        let credential = Self(key);
        credential.signer()?;
        Ok(credential)
    }
}

/// Where the faucet of a run comes from, resolved once per run.
#[derive(Debug, Clone)]
pub enum FaucetSource {
    /// The privileged root faucet, used only with seed `0`.
    Root(RootCredential),
    /// A sub-faucet derived from a non-zero seed.
    Derived(TestSeed),
}

impl FaucetSource {
    /// Selects the faucet for `seed`.
    ///
    /// Seed `0` requires the root credential; any other seed ignores it, so the
    /// root key is never reachable from a public seed.
    pub fn resolve(seed: TestSeed, root: Option<&RootCredential>) -> Result<Self, FundingError> {
        if seed.is_root() {
            root.cloned().map(Self::Root).ok_or_else(|| {
                FundingError::InvalidConfig("seed 0 requires a faucet private key".into())
            })
        } else {
            Ok(Self::Derived(seed))
        }
    }

    /// Builds the faucet account.
    pub fn account(&self) -> Result<Account, FundingError> {
        let signer = match self {
            Self::Root(credential) => credential.signer()?,
            Self::Derived(seed) => derive_faucet_signer(*seed)?,
        };
        Ok(Account::new(signer, AccountRole::Faucet))
    }

    /// Whether this is the root faucet.
    pub const fn is_root(&self) -> bool {
        matches!(self, Self::Root(_))
    }
}

/// Derives the sub-faucet signer for a non-zero seed.
pub fn derive_faucet_signer(seed: TestSeed) -> Result<PrivateKeySigner, FundingError> {
    if seed.is_root() {
        return Err(FundingError::InvalidSeed(
            "seed 0 designates the root faucet and cannot be derived".into(),
        ));
    }
    Ok(derive_signer(FAUCET_TAG, seed, 0))
}

/// Derives the signer of worker `index` for `seed`.
pub fn derive_worker_signer(seed: TestSeed, index: usize) -> PrivateKeySigner {
    derive_signer(WORKER_TAG, seed, index as u64)
}

/// Derives the ordered pool of `n_wallets` cold worker accounts for `seed`.
pub fn derive_pool(seed: TestSeed, n_wallets: usize) -> WalletPool {
    WalletPool::new(
        (0..n_wallets)
            .map(|index| {
                Account::new(derive_worker_signer(seed, index), AccountRole::Worker(index))
            })
            .collect(),
    )
}

fn derive_signer(tag: u8, seed: TestSeed, index: u64) -> PrivateKeySigner {
    let mut attempt: u32 = 0;
    loop {
        let mut hasher = Keccak256::new();
        hasher.update(DOMAIN);
        hasher.update([tag]);
        hasher.update(seed.get().to_be_bytes());
        hasher.update(index.to_be_bytes());
        hasher.update(attempt.to_be_bytes());
        if let Ok(signer) = PrivateKeySigner::from_bytes(&hasher.finalize()) {
            return signer;
        }
        attempt += 1;
    }
}
