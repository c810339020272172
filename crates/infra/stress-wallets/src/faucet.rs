//! Faucet resolution and disbursement.

use alloy_primitives::{Address, TxHash, U256};
use serde::{Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::{
    account::Account,
    context::TestSeed,
    derive::{FaucetSource, RootCredential, derive_faucet_signer},
    error::FundingError,
    network::{NetworkClient, TRANSFER_GAS},
    nonce::init_hot_nonce,
};

/// Report artifact describing how a pool was funded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaucetData {
    /// Address of the faucet that funded the pool.
    pub address: Address,
    /// Wei sent to every worker, reported as a decimal string.
    #[serde(serialize_with = "serialize_decimal")]
    pub funding_per_wallet: U256,
    /// Number of workers in the pool.
    pub n_wallets: usize,
}

fn serialize_decimal<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// The account funding a run's workers.
///
/// A faucet owns a single nonce sequence, so all its transfers are issued one
/// after another. Faucets of different seeds are distinct accounts and may
/// disburse in parallel.
#[derive(Debug)]
pub struct Faucet {
    source: FaucetSource,
    account: Account,
}

impl Faucet {
    /// Resolves the faucet for `seed`: the root credential for seed `0`,
    /// the derived sub-faucet otherwise.
    pub fn resolve(seed: TestSeed, root: Option<&RootCredential>) -> Result<Self, FundingError> {
        Self::from_source(FaucetSource::resolve(seed, root)?)
    }

    /// Builds the faucet from an already resolved source.
    pub fn from_source(source: FaucetSource) -> Result<Self, FundingError> {
        let account = source.account()?;
        Ok(Self { source, account })
    }

    /// Returns the faucet account.
    pub const fn account(&self) -> &Account {
        &self.account
    }

    /// Returns the faucet address.
    pub const fn address(&self) -> Address {
        self.account.address()
    }

    /// Returns the source the faucet was resolved from.
    pub const fn source(&self) -> &FaucetSource {
        &self.source
    }

    /// Seeds the faucet's hot nonce. Required before any transfer.
    pub async fn init_hot_nonce<C>(&self, client: &C) -> Result<u64, FundingError>
    where
        C: NetworkClient + ?Sized,
    {
        init_hot_nonce(client, &self.account).await
    }

    /// Checks that the faucet can pay `amount` to `recipients` accounts plus the
    /// transfer fee of each, returning the required total.
    pub async fn ensure_balance<C>(
        &self,
        client: &C,
        amount: U256,
        recipients: usize,
        gas_price: u128,
    ) -> Result<U256, FundingError>
    where
        C: NetworkClient + ?Sized,
    {
        let required = disbursement_cost(amount, recipients, gas_price)?;
        let available = client
            .get_balance(self.address())
            .await
            .map_err(|e| FundingError::network(self.address(), e))?;

        if available < required {
            warn!(faucet = %self.address(), %required, %available, "Faucet balance too low");
            return Err(FundingError::InsufficientFaucetBalance {
                faucet: self.address(),
                required,
                available,
            });
        }
        Ok(required)
    }

    /// Sends `amount` to the worker at pool position `index`.
    ///
    /// Consumes the next faucet nonce. A failure does not know how many other
    /// workers were funded; callers funding in pool order attach that with
    /// [`FundingError::with_funded`].
    pub async fn fund_wallet<C>(
        &self,
        client: &C,
        index: usize,
        worker: Address,
        amount: U256,
    ) -> Result<TxHash, FundingError>
    where
        C: NetworkClient + ?Sized,
    {
        let nonce = self.account.next_nonce()?;
        let tx_hash = client
            .send_transaction(&self.account, nonce, worker, amount)
            .await
            .map_err(|source| FundingError::PartialDisbursementFailure {
                index,
                worker,
                funded: None,
                source,
            })?;
        debug!(index, %worker, nonce, %tx_hash, "Worker funded");
        Ok(tx_hash)
    }
}

/// A sub-faucet top-up sent by the root faucet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubFaucetFunding {
    /// Seed of the funded sub-faucet.
    pub seed: TestSeed,
    /// Derived address of the sub-faucet.
    pub address: Address,
    /// Hash of the funding transaction.
    pub tx_hash: TxHash,
}

/// Sends `amount` from the root faucet to the derived faucet of each seed.
///
/// Sub-faucets let independent runs fund their workers without sharing the root
/// faucet's nonce sequence. The root faucet's hot nonce is bootstrapped here.
pub async fn fund_sub_faucets<C>(
    client: &C,
    root: &Faucet,
    seeds: &[TestSeed],
    amount: U256,
    gas_price: u128,
) -> Result<Vec<SubFaucetFunding>, FundingError>
where
    C: NetworkClient + ?Sized,
{
    if !root.source().is_root() {
        return Err(FundingError::InvalidConfig(
            "sub-faucets can only be funded by the root faucet".into(),
        ));
    }

    let targets = seeds
        .iter()
        .map(|&seed| Ok((seed, derive_faucet_signer(seed)?.address())))
        .collect::<Result<Vec<_>, FundingError>>()?;

    root.ensure_balance(client, amount, targets.len(), gas_price).await?;
    root.init_hot_nonce(client).await?;

    let mut funded = Vec::with_capacity(targets.len());
    for (index, (seed, address)) in targets.into_iter().enumerate() {
        let tx_hash = root
            .fund_wallet(client, index, address, amount)
            .await
            .map_err(|e| e.with_funded(index))?;
        info!(%seed, %address, %tx_hash, "Sub-faucet funded");
        funded.push(SubFaucetFunding { seed, address, tx_hash });
    }
    Ok(funded)
}

/// Total wei needed to send `amount` to `recipients` accounts, fees included.
pub fn disbursement_cost(
    amount: U256,
    recipients: usize,
    gas_price: u128,
) -> Result<U256, FundingError> {
    U256::from(TRANSFER_GAS)
        .checked_mul(U256::from(gas_price))
        .and_then(|fee| fee.checked_add(amount))
        .and_then(|per_recipient| per_recipient.checked_mul(U256::from(recipients)))
        .ok_or_else(|| FundingError::InvalidConfig("disbursement total overflows 256 bits".into()))
}
