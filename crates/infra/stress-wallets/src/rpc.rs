//! JSON-RPC network client.

use alloy_consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy_eips::eip2718::Encodable2718;
use alloy_network::{Ethereum, TxSignerSync};
use alloy_primitives::{Address, TxHash, U256};
use alloy_provider::{Provider, RootProvider};
use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use crate::{
    account::Account,
    error::FundingError,
    network::{NetworkClient, NetworkError, TRANSFER_GAS},
};

/// [`NetworkClient`] backed by an HTTP JSON-RPC endpoint.
///
/// Transfers are EIP-1559 transactions paying the run's gas price as both the
/// fee cap and the priority fee.
#[derive(Debug, Clone)]
pub struct RpcNetworkClient {
    provider: RootProvider<Ethereum>,
    chain_id: u64,
    gas_price: u128,
}

impl RpcNetworkClient {
    /// Connects to `url` and reads its chain id.
    ///
    /// When `expected_chain_id` is set, a different chain id is a configuration
    /// error.
    pub async fn connect(
        url: Url,
        gas_price: u128,
        expected_chain_id: Option<u64>,
    ) -> Result<Self, FundingError> {
        let provider = RootProvider::<Ethereum>::new_http(url.clone());
        let chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| FundingError::network(Address::ZERO, e.into()))?;

        if let Some(expected) = expected_chain_id
            && expected != chain_id
        {
            return Err(FundingError::InvalidConfig(format!(
                "endpoint {url} serves chain {chain_id}, expected {expected}"
            )));
        }

        info!(%url, chain_id, gas_price, "Connected to network");
        Ok(Self { provider, chain_id, gas_price })
    }

    /// Returns the provider used for requests.
    pub const fn provider(&self) -> &RootProvider<Ethereum> {
        &self.provider
    }

    fn transfer(&self, nonce: u64, to: Address, value: U256) -> TxEip1559 {
        TxEip1559 {
            chain_id: self.chain_id,
            nonce,
            gas_limit: TRANSFER_GAS,
            max_fee_per_gas: self.gas_price,
            max_priority_fee_per_gas: self.gas_price,
            to: to.into(),
            value,
            access_list: Default::default(),
            input: Default::default(),
        }
    }
}

#[async_trait]
impl NetworkClient for RpcNetworkClient {
    async fn send_transaction(
        &self,
        from: &Account,
        nonce: u64,
        to: Address,
        value: U256,
    ) -> Result<TxHash, NetworkError> {
        let mut tx = self.transfer(nonce, to, value);
        let signature = from.signer().sign_transaction_sync(&mut tx)?;
        let signed = tx.into_signed(signature);
        let tx_hash = *signed.hash();
        let envelope = TxEnvelope::Eip1559(signed);

        let _ = self.provider.send_raw_transaction(&envelope.encoded_2718()).await?;

        debug!(%tx_hash, from = %from.address(), %to, nonce, %value, "Transfer sent");
        Ok(tx_hash)
    }

    async fn get_transaction_count(&self, address: Address) -> Result<u64, NetworkError> {
        Ok(self.provider.get_transaction_count(address).pending().await?)
    }

    async fn get_chain_id(&self) -> Result<u64, NetworkError> {
        Ok(self.chain_id)
    }

    async fn get_balance(&self, address: Address) -> Result<U256, NetworkError> {
        Ok(self.provider.get_balance(address).await?)
    }
}
