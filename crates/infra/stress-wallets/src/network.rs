//! Network client collaborator interface.

use std::fmt;

use alloy_primitives::{Address, TxHash, U256};
use alloy_transport::{RpcError, TransportErrorKind};
use async_trait::async_trait;
use thiserror::Error;

use crate::account::Account;

/// Gas used by a plain value transfer.
pub const TRANSFER_GAS: u64 = 21_000;

/// Errors reported by a [`NetworkClient`]. Propagated unchanged by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// The endpoint could not be reached or the response was malformed.
    #[error("transport error: {0}")]
    Transport(String),
    /// The node rejected the request.
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },
    /// The transaction could not be signed.
    #[error("signer error: {0}")]
    Signer(String),
}

impl From<RpcError<TransportErrorKind>> for NetworkError {
    fn from(err: RpcError<TransportErrorKind>) -> Self {
        match err.as_error_resp() {
            Some(payload) => Self::Rpc { code: payload.code, message: payload.message.to_string() },
            None => Self::Transport(err.to_string()),
        }
    }
}

impl From<alloy_signer::Error> for NetworkError {
    fn from(err: alloy_signer::Error) -> Self {
        Self::Signer(err.to_string())
    }
}

/// Chain access used to bootstrap nonces and move funds.
///
/// Implementations are stateless with respect to accounts and must support
/// concurrent independent calls. Retries and timeouts, if any, live here.
#[async_trait]
pub trait NetworkClient: Send + Sync + fmt::Debug {
    /// Signs a value transfer from `from` with the given nonce and broadcasts it.
    async fn send_transaction(
        &self,
        from: &Account,
        nonce: u64,
        to: Address,
        value: U256,
    ) -> Result<TxHash, NetworkError>;

    /// Returns the confirmed plus pending transaction count of `address`.
    async fn get_transaction_count(&self, address: Address) -> Result<u64, NetworkError>;

    /// Returns the chain id of the network.
    async fn get_chain_id(&self) -> Result<u64, NetworkError>;

    /// Returns the balance of `address` in wei.
    async fn get_balance(&self, address: Address) -> Result<U256, NetworkError>;
}
