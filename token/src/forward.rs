// Copyright (c) 2024 The Botho Foundation

//! Signature-authorized forwarding of incoming funds.
//!
//! An account delegates by signing `keccak256("setup forward" || ledger)`
//! (or `... || target` for an explicit target) with its own key. Anyone may
//! submit the signature. The delegation is permanent.

use std::collections::BTreeMap;

use sgo_crypto_secp256k1::{keccak256, recover_address, RecoverableSignature};
use tracing::info;

use crate::{
    event::Event,
    runtime::{CallContext, Delivery, Source},
    Address, Amount, TokenError,
};

/// Prefix of every forward authorization message.
pub const FORWARD_MESSAGE_PREFIX: &[u8] = b"setup forward";

/// Longest forwarding chain a credit may follow.
pub const MAX_FORWARD_HOPS: usize = 8;

/// Where a forwarded account's funds go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForwardTarget {
    /// Whatever the ledger's auto-forward receiver is at credit time.
    AutoForwardReceiver,
    /// A fixed account.
    Account(Address),
}

/// Digest an account signs to forward its funds on `ledger`.
///
/// `target` is `None` for an auto-forward delegation.
pub fn forward_digest(ledger: &Address, target: Option<&Address>) -> [u8; 32] {
    match target {
        None => keccak256(&[FORWARD_MESSAGE_PREFIX, ledger.as_bytes()]),
        Some(to) => keccak256(&[FORWARD_MESSAGE_PREFIX, ledger.as_bytes(), to.as_bytes()]),
    }
}

/// Check that `signature` was produced by `from` over the forward digest.
pub fn verify_forward_authorization(
    ledger: &Address,
    from: &Address,
    target: Option<&Address>,
    signature: &RecoverableSignature,
) -> Result<(), TokenError> {
    let digest = forward_digest(ledger, target);
    let signer = recover_address(&digest, signature).map_err(|_| TokenError::InvalidSignature)?;
    if Address::new(signer) != *from {
        return Err(TokenError::InvalidSignature);
    }
    Ok(())
}

/// Forward entries and the auto-forward receiver of one ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ForwardRegistry {
    entries: BTreeMap<Address, ForwardTarget>,
    auto_forward_receiver: Option<Address>,
}

impl ForwardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_forward_receiver(&self) -> Option<Address> {
        self.auto_forward_receiver
    }

    pub fn target(&self, from: &Address) -> Option<ForwardTarget> {
        self.entries.get(from).copied()
    }

    pub fn is_forwarded(&self, from: &Address) -> bool {
        self.entries.contains_key(from)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every forwarded account with its target, in address order.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &ForwardTarget)> {
        self.entries.iter()
    }

    /// The next hop for funds credited to `account`, if any.
    pub fn next_hop(&self, account: &Address) -> Option<Address> {
        match self.entries.get(account)? {
            ForwardTarget::Account(to) => Some(*to),
            ForwardTarget::AutoForwardReceiver => self.auto_forward_receiver,
        }
    }

    /// Record a delegation. Entries are never overwritten.
    pub(crate) fn insert(&mut self, from: Address, target: ForwardTarget) -> Result<(), TokenError> {
        if self.entries.contains_key(&from) {
            return Err(TokenError::AlreadyForwarded(from));
        }
        if let ForwardTarget::Account(to) = target {
            if to.is_zero() {
                return Err(TokenError::InvalidRecipient(to));
            }
        }
        self.entries.insert(from, target);
        Ok(())
    }

    pub(crate) fn set_auto_forward_receiver(&mut self, receiver: Address) -> bool {
        if self.auto_forward_receiver == Some(receiver) {
            return false;
        }
        self.auto_forward_receiver = Some(receiver);
        true
    }
}

impl CallContext<'_> {
    pub fn auto_forward_receiver(&self, token: &Address) -> Result<Option<Address>, TokenError> {
        Ok(self.ledger(token)?.forwards.auto_forward_receiver())
    }

    pub fn forward_target(
        &self,
        token: &Address,
        from: &Address,
    ) -> Result<Option<ForwardTarget>, TokenError> {
        Ok(self.ledger(token)?.forwards.target(from))
    }

    /// Owner only. Fails if the new receiver would close a forwarding loop
    /// or stretch any chain past [`MAX_FORWARD_HOPS`].
    ///
    /// Setting the first receiver sweeps the balances of accounts that set up
    /// auto-forwarding while there was none.
    pub fn set_auto_forward_receiver(
        &mut self,
        token: Address,
        receiver: Address,
    ) -> Result<(), TokenError> {
        if receiver.is_zero() {
            return Err(TokenError::InvalidRecipient(receiver));
        }
        let caller = self.caller();
        let ledger = self.ledger_mut(&token)?;
        ledger.ensure_owner(&caller)?;
        let previous = ledger.forwards.auto_forward_receiver();
        if !ledger.forwards.set_auto_forward_receiver(receiver) {
            return Ok(());
        }
        self.resolve(&token, receiver, false)?;
        self.check_forward_chains(&token)?;
        info!(ledger = %token, %receiver, "Auto-forward receiver set");

        if previous.is_none() {
            self.sweep_pending_auto_forwards(token)?;
        }
        Ok(())
    }

    /// Forward everything `from` receives to the auto-forward receiver.
    pub fn setup_auto_forward(
        &mut self,
        token: Address,
        from: Address,
        signature: &RecoverableSignature,
    ) -> Result<(), TokenError> {
        self.install_forward(token, from, ForwardTarget::AutoForwardReceiver, signature)
    }

    /// Forward everything `from` receives to `to`.
    pub fn setup_forward(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        signature: &RecoverableSignature,
    ) -> Result<(), TokenError> {
        self.install_forward(token, from, ForwardTarget::Account(to), signature)
    }

    fn install_forward(
        &mut self,
        token: Address,
        from: Address,
        target: ForwardTarget,
        signature: &RecoverableSignature,
    ) -> Result<(), TokenError> {
        let explicit = match target {
            ForwardTarget::Account(to) => Some(to),
            ForwardTarget::AutoForwardReceiver => None,
        };
        verify_forward_authorization(&token, &from, explicit.as_ref(), signature)?;

        self.ledger_mut(&token)?.forwards.insert(from, target)?;
        let route = self.resolve(&token, from, false)?;
        self.check_forward_chains(&token)?;

        // Sweep what the account already holds.
        let balance = self.balance_of(&token, &from)?;
        if balance > 0 && route.path.len() > 1 {
            self.deliver(Delivery {
                token,
                from: Source::Account(from),
                to: route.path[1],
                amount: balance,
                payer: from,
                notice: None,
            })?;
        }

        info!(ledger = %token, %from, ?target, swept = balance, "Forward set up");
        self.emit(token, Event::SetupAutoForward { address: from });
        Ok(())
    }

    /// Resolve every forwarded account. A new entry or receiver can lengthen
    /// the chains of accounts that already forward into it.
    fn check_forward_chains(&mut self, token: &Address) -> Result<(), TokenError> {
        let accounts: Vec<Address> = self
            .ledger(token)?
            .forwards
            .iter()
            .map(|(account, _)| *account)
            .collect();
        for account in accounts {
            self.resolve(token, account, false)?;
        }
        Ok(())
    }

    /// Move what auto-forwarded accounts collected while no receiver was set.
    fn sweep_pending_auto_forwards(&mut self, token: Address) -> Result<(), TokenError> {
        let ledger = self.ledger(&token)?;
        let pending: Vec<(Address, Amount)> = ledger
            .forwards
            .iter()
            .filter(|(_, target)| **target == ForwardTarget::AutoForwardReceiver)
            .map(|(account, _)| (*account, ledger.balance_of(account)))
            .filter(|(_, balance)| *balance > 0)
            .collect();

        for (account, balance) in pending {
            let route = self.resolve(&token, account, false)?;
            let Some(&next) = route.path.get(1) else {
                continue;
            };
            self.deliver(Delivery {
                token,
                from: Source::Account(account),
                to: next,
                amount: balance,
                payer: account,
                notice: None,
            })?;
            info!(ledger = %token, %account, swept = balance, "Swept pending auto-forward");
        }
        Ok(())
    }
}
