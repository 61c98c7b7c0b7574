// Copyright (c) 2024 The Botho Foundation

//! A sale that pays cashback in a companion ledger.
//!
//! Payments in the payment token are kept as raised funds. For each payment
//! the sale transfers `amount × reward_rate_bps / 10_000` of the reward token
//! to the attributed payer, limited by the reward stock it holds. The reward
//! transfer is an ordinary transfer on the reward ledger, so it follows the
//! payer's forwards and hooks like any other credit.

use std::any::Any;

use tracing::{debug, info};

use crate::{receiver::ReceiverContract, runtime::CallContext, Address, Amount, Role, TokenError};

/// Reward rate meaning "one reward unit per payment unit".
pub const BPS_DENOMINATOR: u32 = 10_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CashbackSale {
    address: Address,
    owner: Address,
    payment_token: Address,
    reward_token: Option<Address>,
    reward_rate_bps: u32,
    total_raised: Amount,
    total_rewarded: Amount,
}

impl CashbackSale {
    pub fn new(address: Address, owner: Address, payment_token: Address, reward_rate_bps: u32) -> Self {
        Self {
            address,
            owner,
            payment_token,
            reward_token: None,
            reward_rate_bps,
            total_raised: 0,
            total_rewarded: 0,
        }
    }

    pub fn with_reward_token(mut self, reward_token: Address) -> Self {
        self.reward_token = Some(reward_token);
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn payment_token(&self) -> Address {
        self.payment_token
    }

    pub fn reward_token(&self) -> Option<Address> {
        self.reward_token
    }

    pub fn reward_rate_bps(&self) -> u32 {
        self.reward_rate_bps
    }

    pub fn total_raised(&self) -> Amount {
        self.total_raised
    }

    pub fn total_rewarded(&self) -> Amount {
        self.total_rewarded
    }

    /// Reward owed for a payment of `amount`, before the stock limit.
    pub fn reward_for(&self, amount: Amount) -> Result<Amount, TokenError> {
        amount
            .checked_mul(Amount::from(self.reward_rate_bps))
            .map(|scaled| scaled / Amount::from(BPS_DENOMINATOR))
            .ok_or(TokenError::ArithmeticOverflow)
    }

    fn ensure_owner(&self, caller: Address) -> Result<(), TokenError> {
        if caller != self.owner {
            return Err(TokenError::Unauthorized {
                caller,
                role: Role::Owner,
            });
        }
        Ok(())
    }

    /// Owner only.
    pub fn set_reward_token(&mut self, caller: Address, reward_token: Address) -> Result<(), TokenError> {
        self.ensure_owner(caller)?;
        info!(sale = %self.address, %reward_token, "Reward token set");
        self.reward_token = Some(reward_token);
        Ok(())
    }

    /// Owner only. Sends raised payment tokens to `to`.
    pub fn withdraw(
        &mut self,
        ctx: &mut CallContext<'_>,
        caller: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        self.ensure_owner(caller)?;
        ctx.transfer(self.payment_token, to, amount)?;
        info!(sale = %self.address, %to, amount, "Withdrew raised funds");
        Ok(())
    }
}

impl ReceiverContract for CashbackSale {
    fn on_receive(
        &mut self,
        ctx: &mut CallContext<'_>,
        token: Address,
        from: Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        if token != self.payment_token {
            if self.reward_token == Some(token) {
                debug!(sale = %self.address, amount, "Reward stock deposited");
                return Ok(());
            }
            return Err(TokenError::Unauthorized {
                caller: token,
                role: Role::PaymentToken,
            });
        }

        self.total_raised = self
            .total_raised
            .checked_add(amount)
            .ok_or(TokenError::ArithmeticOverflow)?;

        let Some(reward_token) = self.reward_token else {
            return Ok(());
        };
        // Newly minted supply has no one to reward.
        if from.is_zero() {
            return Ok(());
        }

        let stock = ctx.balance_of(&reward_token, &self.address)?;
        let reward = self.reward_for(amount)?.min(stock);
        if reward == 0 {
            return Ok(());
        }

        ctx.transfer(reward_token, from, reward)?;
        self.total_rewarded = self
            .total_rewarded
            .checked_add(reward)
            .ok_or(TokenError::ArithmeticOverflow)?;
        info!(sale = %self.address, payer = %from, amount, reward, "Paid cashback");
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALE: Address = Address::new([0x5a; 20]);
    const OWNER: Address = Address::new([1; 20]);
    const BASE: Address = Address::new([0xb0; 20]);

    #[test]
    fn test_reward_rate() {
        let sale = CashbackSale::new(SALE, OWNER, BASE, 10 * BPS_DENOMINATOR);
        assert_eq!(sale.reward_for(2).unwrap(), 20);

        let half = CashbackSale::new(SALE, OWNER, BASE, BPS_DENOMINATOR / 2);
        assert_eq!(half.reward_for(5).unwrap(), 2);

        assert_eq!(sale.reward_for(Amount::MAX), Err(TokenError::ArithmeticOverflow));
    }

    #[test]
    fn test_set_reward_token_owner_only() {
        let mut sale = CashbackSale::new(SALE, OWNER, BASE, BPS_DENOMINATOR);
        let sub = Address::new([0xc0; 20]);
        let outsider = Address::new([9; 20]);

        assert_eq!(
            sale.set_reward_token(outsider, sub),
            Err(TokenError::Unauthorized {
                caller: outsider,
                role: Role::Owner
            })
        );
        sale.set_reward_token(OWNER, sub).unwrap();
        assert_eq!(sale.reward_token(), Some(sub));
    }
}
