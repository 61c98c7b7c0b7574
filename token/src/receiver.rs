// Copyright (c) 2024 The Botho Foundation

//! Receiver contracts and the registry that whitelists them.

use std::{any::Any, collections::BTreeSet, fmt::Debug};

use dyn_clone::DynClone;
use tracing::info;

use crate::{runtime::CallContext, Address, Amount, TokenError};

/// Contract code that runs when a ledger credits the contract.
///
/// The hook runs after the credit is fully applied. Any ledger operation the
/// hook performs through `ctx` is made with the contract as the caller.
/// Returning an error reverts the entire call that triggered the hook.
pub trait ReceiverContract: DynClone + Debug {
    /// `token` credited this contract with `amount`, attributed to `from`.
    fn on_receive(
        &mut self,
        ctx: &mut CallContext<'_>,
        token: Address,
        from: Address,
        amount: Amount,
    ) -> Result<(), TokenError>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

dyn_clone::clone_trait_object!(ReceiverContract);

/// Addresses a ledger will run receiver hooks on. Membership only grows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReceiverHookRegistry {
    receivers: BTreeSet<Address>,
}

impl ReceiverHookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.receivers.contains(address)
    }

    /// Returns whether `address` was newly registered.
    pub(crate) fn register(&mut self, address: Address) -> bool {
        self.receivers.insert(address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.receivers.iter()
    }
}

impl CallContext<'_> {
    pub fn is_receiver_contract(&self, token: &Address, address: &Address) -> Result<bool, TokenError> {
        Ok(self.ledger(token)?.receivers.contains(address))
    }

    /// Owner only. Registering twice changes nothing.
    pub fn register_receiver_contract(
        &mut self,
        token: Address,
        address: Address,
    ) -> Result<(), TokenError> {
        let caller = self.caller();
        let ledger = self.ledger_mut(&token)?;
        ledger.ensure_owner(&caller)?;
        if ledger.receivers.register(address) {
            info!(ledger = %token, receiver = %address, "Receiver contract registered");
        }
        Ok(())
    }
}
