//! Signing accounts and their hot nonce counters.

use std::{
    fmt,
    ops::Deref,
    sync::atomic::{AtomicU64, Ordering},
};

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;

use crate::error::FundingError;

/// Sentinel for a counter that has not been initialised from the network.
const COLD: u64 = u64::MAX;

/// Role an account plays in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountRole {
    /// The account disbursing funds to the workers.
    Faucet,
    /// A worker wallet, identified by its pool index.
    Worker(usize),
}

/// A signing account owning its local nonce counter.
///
/// The counter starts cold. [`Account::set_hot_nonce`] seeds it from the
/// network-reported transaction count, after which [`Account::next_nonce`]
/// hands out strictly increasing, gap-free nonces. Handing out a nonce is a
/// single atomic step, so concurrent callers never observe the same value.
pub struct Account {
    signer: PrivateKeySigner,
    address: Address,
    role: AccountRole,
    nonce: AtomicU64,
}

impl Account {
    /// Creates a cold account for the given signer.
    pub fn new(signer: PrivateKeySigner, role: AccountRole) -> Self {
        let address = signer.address();
        Self { signer, address, role, nonce: AtomicU64::new(COLD) }
    }

    /// Returns the account address.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Returns the role of the account.
    pub const fn role(&self) -> AccountRole {
        self.role
    }

    /// Returns the signer backing the account.
    pub const fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }

    /// Seeds the local counter with the network transaction count.
    ///
    /// Re-seeding replaces any previous value.
    pub fn set_hot_nonce(&self, nonce: u64) {
        self.nonce.store(nonce, Ordering::SeqCst);
    }

    /// Returns the next nonce to use without consuming it.
    pub fn peek_nonce(&self) -> Option<u64> {
        match self.nonce.load(Ordering::SeqCst) {
            COLD => None,
            nonce => Some(nonce),
        }
    }

    /// Whether the local counter has been seeded.
    pub fn is_hot(&self) -> bool {
        self.peek_nonce().is_some()
    }

    /// Consumes and returns the next nonce.
    pub fn next_nonce(&self) -> Result<u64, FundingError> {
        self.nonce
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |nonce| match nonce {
                COLD => None,
                nonce => Some(nonce + 1),
            })
            .map_err(|_| FundingError::NonceNotInitialized(self.address))
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .field("role", &self.role)
            .field("nonce", &self.peek_nonce())
            .finish_non_exhaustive()
    }
}

/// Ordered pool of worker accounts, created before any test traffic.
#[derive(Debug)]
pub struct WalletPool {
    workers: Vec<Account>,
}

impl WalletPool {
    /// Wraps an ordered list of workers.
    pub const fn new(workers: Vec<Account>) -> Self {
        Self { workers }
    }

    /// Worker addresses in pool order.
    pub fn addresses(&self) -> Vec<Address> {
        self.workers.iter().map(Account::address).collect()
    }

    /// Returns the worker at `index`.
    pub fn worker(&self, index: usize) -> Option<&Account> {
        self.workers.get(index)
    }
}

impl Deref for WalletPool {
    type Target = [Account];

    fn deref(&self) -> &Self::Target {
        &self.workers
    }
}
