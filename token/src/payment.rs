// Copyright (c) 2024 The Botho Foundation

//! Paying a receiver contract on behalf of someone else.

use tracing::info;

use crate::{
    event::Event,
    runtime::{CallContext, Delivery, Source},
    Address, Amount, TokenError,
};

impl CallContext<'_> {
    /// Pay `amount` of the caller's funds to `contract`, attributing the
    /// payment to `beneficiary`.
    ///
    /// `contract` must be a registered receiver. Its hook sees `beneficiary`
    /// as the payer, so rewards and refunds go to the beneficiary rather than
    /// the caller.
    pub fn pay_to_contract_on_behalf(
        &mut self,
        token: Address,
        beneficiary: Address,
        contract: Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        if !self.ledger(&token)?.receivers.contains(&contract) {
            return Err(TokenError::UnregisteredReceiver(contract));
        }
        if beneficiary.is_zero() {
            return Err(TokenError::InvalidRecipient(beneficiary));
        }

        let sender = self.caller();
        self.deliver(Delivery {
            token,
            from: Source::Account(sender),
            to: contract,
            amount,
            payer: beneficiary,
            notice: Some(Event::PayOnBehalf {
                sender,
                from: beneficiary,
                to: contract,
                amount,
            }),
        })?;
        info!(ledger = %token, %sender, %beneficiary, %contract, amount, "Paid on behalf");
        Ok(())
    }
}
