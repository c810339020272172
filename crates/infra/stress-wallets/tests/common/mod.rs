//! In-memory chain used by the integration tests.

#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use alloy_primitives::{Address, TxHash, U256, keccak256};
use async_trait::async_trait;
use stress_wallets::{Account, NetworkClient, NetworkError, TRANSFER_GAS};

pub const CHAIN_ID: u64 = 1337;

pub const ANVIL_KEY_0: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// A transfer accepted by the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTx {
    pub from: Address,
    pub to: Address,
    pub nonce: u64,
    pub value: U256,
    pub hash: TxHash,
}

#[derive(Debug, Default)]
struct State {
    nonces: HashMap<Address, u64>,
    balances: HashMap<Address, U256>,
    sent: Vec<SentTx>,
    count_queries: Vec<Address>,
}

/// Chain with per-account nonces and balances.
///
/// Transfers must carry exactly the sender's next nonce, as a node would
/// require for immediate inclusion; anything else is rejected.
#[derive(Debug)]
pub struct MockChain {
    gas_price: u128,
    state: Mutex<State>,
    offline: Mutex<bool>,
    fail_transfers_to: Mutex<HashSet<Address>>,
    fail_count_for: Mutex<HashSet<Address>>,
}

impl MockChain {
    pub fn new(gas_price: u128) -> Self {
        Self {
            gas_price,
            state: Mutex::default(),
            offline: Mutex::new(false),
            fail_transfers_to: Mutex::default(),
            fail_count_for: Mutex::default(),
        }
    }

    pub fn fund(&self, address: Address, amount: U256) {
        *self.state.lock().unwrap().balances.entry(address).or_default() += amount;
    }

    /// Pretends `count` transactions were already mined from `address`.
    pub fn set_nonce(&self, address: Address, count: u64) {
        self.state.lock().unwrap().nonces.insert(address, count);
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    pub fn fail_transfers_to(&self, address: Address) {
        self.fail_transfers_to.lock().unwrap().insert(address);
    }

    pub fn fail_count_for(&self, address: Address) {
        self.fail_count_for.lock().unwrap().insert(address);
    }

    pub fn sent(&self) -> Vec<SentTx> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn sent_from(&self, address: Address) -> Vec<SentTx> {
        self.sent().into_iter().filter(|tx| tx.from == address).collect()
    }

    pub fn balance(&self, address: Address) -> U256 {
        self.state.lock().unwrap().balances.get(&address).copied().unwrap_or_default()
    }

    pub fn nonce(&self, address: Address) -> u64 {
        self.state.lock().unwrap().nonces.get(&address).copied().unwrap_or_default()
    }

    pub fn count_queries(&self) -> Vec<Address> {
        self.state.lock().unwrap().count_queries.clone()
    }

    fn check_online(&self) -> Result<(), NetworkError> {
        if *self.offline.lock().unwrap() {
            return Err(NetworkError::Transport("connection refused".into()));
        }
        Ok(())
    }
}

fn rpc_error(message: &str) -> NetworkError {
    NetworkError::Rpc { code: -32000, message: message.into() }
}

#[async_trait]
impl NetworkClient for MockChain {
    async fn send_transaction(
        &self,
        from: &Account,
        nonce: u64,
        to: Address,
        value: U256,
    ) -> Result<TxHash, NetworkError> {
        self.check_online()?;
        if self.fail_transfers_to.lock().unwrap().contains(&to) {
            return Err(NetworkError::Transport("connection reset".into()));
        }

        let mut state = self.state.lock().unwrap();
        let sender = from.address();
        let expected = state.nonces.get(&sender).copied().unwrap_or_default();
        if nonce < expected {
            return Err(rpc_error("nonce too low"));
        }
        if nonce > expected {
            return Err(rpc_error("nonce too high"));
        }

        let cost = value + U256::from(TRANSFER_GAS) * U256::from(self.gas_price);
        let balance = state.balances.get(&sender).copied().unwrap_or_default();
        if balance < cost {
            return Err(rpc_error("insufficient funds for gas * price + value"));
        }

        state.balances.insert(sender, balance - cost);
        *state.balances.entry(to).or_default() += value;
        state.nonces.insert(sender, nonce + 1);

        let hash = keccak256([sender.as_slice(), nonce.to_be_bytes().as_slice()].concat());
        state.sent.push(SentTx { from: sender, to, nonce, value, hash });
        Ok(hash)
    }

    async fn get_transaction_count(&self, address: Address) -> Result<u64, NetworkError> {
        self.check_online()?;
        if self.fail_count_for.lock().unwrap().contains(&address) {
            return Err(NetworkError::Transport("request timed out".into()));
        }
        let mut state = self.state.lock().unwrap();
        state.count_queries.push(address);
        Ok(state.nonces.get(&address).copied().unwrap_or_default())
    }

    async fn get_chain_id(&self) -> Result<u64, NetworkError> {
        self.check_online()?;
        Ok(CHAIN_ID)
    }

    async fn get_balance(&self, address: Address) -> Result<U256, NetworkError> {
        self.check_online()?;
        Ok(self.balance(address))
    }
}

/// Plenty of wei for any faucet in these tests.
pub fn rich() -> U256 {
    U256::from(10u64).pow(U256::from(24u64))
}
