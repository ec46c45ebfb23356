//! Transaction Submitter: native-currency transfers from the connected account

use serde_json::json;
use tracing::info;

use crate::core::protocol::methods;
use crate::core::{networks, units, Address};
use crate::error::{Action, WalletError, WalletResult};
use crate::session::SessionManager;

#[derive(Clone)]
pub struct TransactionSubmitter {
    session: SessionManager,
}

impl TransactionSubmitter {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    /// Send `amount` (decimal, in the chain's native unit) to `recipient`.
    /// Returns the transaction hash; the balance is refreshed after a short delay.
    pub async fn send(&self, recipient: &str, amount: &str) -> WalletResult<String> {
        match self.submit(recipient, amount).await {
            Ok(hash) => Ok(hash),
            Err(e) => {
                self.session.report(&e);
                Err(e)
            }
        }
    }

    async fn submit(&self, recipient: &str, amount: &str) -> WalletResult<String> {
        let handle = self.session.active_handle().ok_or(WalletError::NotConnected)?;

        let (recipient, amount) = (recipient.trim(), amount.trim());
        if recipient.is_empty() || amount.is_empty() {
            return Err(WalletError::InvalidInput(
                "Please provide both recipient address and amount".into(),
            ));
        }
        let to = Address::parse(recipient)?;
        let value = units::parse_units(amount, networks::decimals_for(Some(handle.chain_id)))?;

        let tx = json!([{
            "from": handle.address,
            "to": to,
            "value": units::to_quantity(value),
        }]);
        let result = handle
            .provider
            .request(methods::SEND_TRANSACTION, tx)
            .await
            .map_err(|e| WalletError::from_rpc(Action::SendTransaction, e))?;
        let hash = result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WalletError::InvalidResponse(format!("{}: {}", methods::SEND_TRANSACTION, result)))?;

        info!(
            hash = %hash,
            to = %to.truncated(),
            amount = %amount,
            chain = %handle.chain_id,
            "transaction submitted"
        );
        self.session.schedule_balance_refresh(handle.token);
        Ok(hash)
    }
}
