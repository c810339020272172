//! Hot nonce bootstrap.

use tracing::debug;

use crate::{account::Account, error::FundingError, network::NetworkClient};

/// Seeds `account`'s local nonce counter with its current transaction count.
///
/// Must complete before the account sends anything, otherwise two of its
/// transactions could collide on a nonce. Network failures are returned as
/// [`FundingError::NetworkUnavailable`] and never retried here.
pub async fn init_hot_nonce<C>(client: &C, account: &Account) -> Result<u64, FundingError>
where
    C: NetworkClient + ?Sized,
{
    let nonce = client
        .get_transaction_count(account.address())
        .await
        .map_err(|e| FundingError::network(account.address(), e))?;
    account.set_hot_nonce(nonce);
    debug!(address = %account.address(), role = ?account.role(), nonce, "Hot nonce initialised");
    Ok(nonce)
}
