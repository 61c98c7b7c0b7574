// Copyright (c) 2024 The Botho Foundation

//! Time-gated supply release.
//!
//! ## Formula
//!
//! ```text
//! released(t)    = floor(mint_cap × elapsed / (elapsed + half_mint_period))
//! mint_amount(t) = released(t) − minted_so_far
//! ```
//!
//! Half of the cap is available after one half period and two thirds after
//! two. The cap is approached but never reached. `released` is evaluated as
//! `cap − ceil(cap × half / (elapsed + half))`, which is the same value but
//! keeps `elapsed` out of the multiplication.

use tracing::{debug, info};

use crate::{
    event::Event,
    runtime::{CallContext, Delivery, Source},
    Address, Amount, Timestamp, TokenError,
};

/// Mint roles, schedule parameters and progress of one ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintScheduler {
    mint_manager: Option<Address>,
    mint_receiver: Option<Address>,
    mint_start_time: Timestamp,
    half_mint_period: u64,
    mint_cap: Amount,
    minted_so_far: Amount,
}

impl MintScheduler {
    pub fn new(mint_cap: Amount, half_mint_period: u64, mint_start_time: Timestamp) -> Self {
        Self {
            mint_manager: None,
            mint_receiver: None,
            mint_start_time,
            half_mint_period,
            mint_cap,
            minted_so_far: 0,
        }
    }

    pub fn mint_manager(&self) -> Option<Address> {
        self.mint_manager
    }

    pub fn mint_receiver(&self) -> Option<Address> {
        self.mint_receiver
    }

    pub fn mint_start_time(&self) -> Timestamp {
        self.mint_start_time
    }

    pub fn half_mint_period(&self) -> u64 {
        self.half_mint_period
    }

    pub fn mint_cap(&self) -> Amount {
        self.mint_cap
    }

    pub fn minted_so_far(&self) -> Amount {
        self.minted_so_far
    }

    /// Total supply the schedule has released by `now`, minted or not.
    pub fn released(&self, now: Timestamp) -> Result<Amount, TokenError> {
        if self.mint_cap == 0 {
            return Ok(0);
        }
        let elapsed = now.saturating_sub(self.mint_start_time) as Amount;
        let half = self.half_mint_period as Amount;
        let denominator = elapsed + half;
        if denominator == 0 {
            return Ok(0);
        }

        let withheld = self
            .mint_cap
            .checked_mul(half)
            .ok_or(TokenError::ArithmeticOverflow)?
            .div_ceil(denominator);
        Ok(self.mint_cap - withheld)
    }

    /// Amount `mint()` would release at `now`.
    pub fn mint_amount(&self, now: Timestamp) -> Result<Amount, TokenError> {
        Ok(self.released(now)?.saturating_sub(self.minted_so_far))
    }

    /// Set the mint manager. Returns whether the value changed.
    pub(crate) fn set_mint_manager(&mut self, manager: Address) -> bool {
        if self.mint_manager == Some(manager) {
            return false;
        }
        info!(%manager, "Mint manager set");
        self.mint_manager = Some(manager);
        true
    }

    /// Set the mint receiver. Only the mint manager may do this.
    pub(crate) fn set_mint_receiver(
        &mut self,
        caller: Address,
        receiver: Address,
    ) -> Result<bool, TokenError> {
        if self.mint_manager != Some(caller) {
            return Err(TokenError::Unauthorized {
                caller,
                role: crate::Role::MintManager,
            });
        }
        if receiver.is_zero() {
            return Err(TokenError::InvalidRecipient(receiver));
        }
        if self.mint_receiver == Some(receiver) {
            return Ok(false);
        }
        info!(%receiver, "Mint receiver set");
        self.mint_receiver = Some(receiver);
        Ok(true)
    }

    /// Claim everything currently releasable.
    ///
    /// Advances `minted_so_far` before any funds move, so the returned amount
    /// can only be claimed once.
    pub(crate) fn take_mintable(&mut self, now: Timestamp) -> Result<(Address, Amount), TokenError> {
        let receiver = self.mint_receiver.ok_or(TokenError::NothingToMint)?;
        let amount = self.mint_amount(now)?;
        if amount == 0 {
            return Err(TokenError::NothingToMint);
        }

        let minted = self
            .minted_so_far
            .checked_add(amount)
            .ok_or(TokenError::ArithmeticOverflow)?;
        if minted > self.mint_cap {
            return Err(TokenError::MintCapExceeded {
                cap: self.mint_cap,
                requested: minted,
            });
        }
        self.minted_so_far = minted;

        debug!(%receiver, amount, minted_so_far = minted, "Released supply");
        Ok((receiver, amount))
    }
}

impl CallContext<'_> {
    pub fn mint_cap(&self, token: &Address) -> Result<Amount, TokenError> {
        Ok(self.ledger(token)?.mint.mint_cap())
    }

    pub fn half_mint_period(&self, token: &Address) -> Result<u64, TokenError> {
        Ok(self.ledger(token)?.mint.half_mint_period())
    }

    pub fn mint_receiver(&self, token: &Address) -> Result<Option<Address>, TokenError> {
        Ok(self.ledger(token)?.mint.mint_receiver())
    }

    /// Amount `mint` would release right now.
    pub fn mint_amount(&self, token: &Address) -> Result<Amount, TokenError> {
        self.ledger(token)?.mint.mint_amount(self.now())
    }

    /// Owner only.
    pub fn set_mint_manager(&mut self, token: Address, manager: Address) -> Result<(), TokenError> {
        let caller = self.caller();
        let ledger = self.ledger_mut(&token)?;
        ledger.ensure_owner(&caller)?;
        ledger.mint.set_mint_manager(manager);
        Ok(())
    }

    /// Mint manager only.
    pub fn set_mint_receiver(&mut self, token: Address, receiver: Address) -> Result<(), TokenError> {
        let caller = self.caller();
        self.ledger_mut(&token)?
            .mint
            .set_mint_receiver(caller, receiver)?;
        Ok(())
    }

    /// Release everything currently mintable to the mint receiver. Anyone may
    /// call this.
    pub fn mint(&mut self, token: Address) -> Result<Amount, TokenError> {
        let now = self.now();
        let (receiver, amount) = self.ledger_mut(&token)?.mint.take_mintable(now)?;

        self.emit(token, Event::Mint { to: receiver, amount });
        self.deliver(Delivery {
            token,
            from: Source::Issue,
            to: receiver,
            amount,
            payer: Address::ZERO,
            notice: None,
        })?;
        info!(ledger = %token, %receiver, amount, "Minted");
        Ok(amount)
    }
}
