// Copyright (c) 2024 The Botho Foundation

//! Receiver contracts that exercise hook semantics.

use std::any::Any;

use sgo_token::{Address, Amount, CallContext, ReceiverContract, TokenError};

/// What a [`Recorder`] saw when its hook ran.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Observation {
    pub token: Address,
    pub from: Address,
    pub amount: Amount,
    /// The recorder's own balance as read from inside the hook.
    pub balance: Amount,
    pub total_supply: Amount,
    pub caller: Address,
}

/// Accepts everything and records each hook invocation.
#[derive(Clone, Debug)]
pub struct Recorder {
    pub address: Address,
    pub seen: Vec<Observation>,
}

impl Recorder {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            seen: Vec::new(),
        }
    }
}

impl ReceiverContract for Recorder {
    fn on_receive(
        &mut self,
        ctx: &mut CallContext<'_>,
        token: Address,
        from: Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        self.seen.push(Observation {
            token,
            from,
            amount,
            balance: ctx.balance_of(&token, &self.address)?,
            total_supply: ctx.total_supply(&token)?,
            caller: ctx.caller(),
        });
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Passes every payment on to `target` from inside its hook.
#[derive(Clone, Debug)]
pub struct Relay {
    pub target: Address,
}

impl ReceiverContract for Relay {
    fn on_receive(
        &mut self,
        ctx: &mut CallContext<'_>,
        token: Address,
        _from: Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        ctx.transfer(token, self.target, amount)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Rejects every payment after trying to keep a record of it.
#[derive(Clone, Debug, Default)]
pub struct Rejector {
    pub attempts: u32,
}

impl ReceiverContract for Rejector {
    fn on_receive(
        &mut self,
        _ctx: &mut CallContext<'_>,
        token: Address,
        _from: Address,
        _amount: Amount,
    ) -> Result<(), TokenError> {
        self.attempts += 1;
        Err(TokenError::Unauthorized {
            caller: token,
            role: sgo_token::Role::PaymentToken,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
