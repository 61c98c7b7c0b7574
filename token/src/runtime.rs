// Copyright (c) 2024 The Botho Foundation

//! Call sequencing, atomic commit and the credit pipeline.
//!
//! [`Chain`] owns every ledger and receiver contract by address. Each call
//! runs through [`Chain::execute`] against a [`CallContext`]; if the call
//! fails, the state is restored to its snapshot so no effect is observable.
//!
//! Every credit goes through the same pipeline:
//!
//! 1. Resolve the recipient through forward entries (adopting delegations
//!    from a linked ledger on the way).
//! 2. Check the final recipient may receive funds.
//! 3. Move the balances and emit one `Transfer` per hop.
//! 4. Run the final recipient's receiver hook, if it has one.
//!
//! All balance effects are applied before step 4, so a hook calling back into
//! any ledger observes the post-credit state.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::{
    config::{ConfigError, LedgerConfig},
    event::{Event, LogEntry},
    forward::{ForwardTarget, MAX_FORWARD_HOPS},
    ledger::Ledger,
    receiver::ReceiverContract,
    Address, Amount, Timestamp, TokenError,
};

/// Deepest nesting of contract calls within one call.
pub const MAX_CALL_DEPTH: usize = 16;

#[derive(Clone, Debug, Default)]
struct WorldState {
    ledgers: BTreeMap<Address, Ledger>,
    contracts: BTreeMap<Address, Box<dyn ReceiverContract>>,
    nonces: BTreeMap<Address, u64>,
}

/// Result of a committed call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt<T> {
    pub value: T,
    /// Events in emission order.
    pub events: Vec<LogEntry>,
}

impl<T> Receipt<T> {
    /// Events emitted by `ledger`, in order.
    pub fn events_from(&self, ledger: &Address) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|entry| entry.emitter == *ledger)
            .map(|entry| &entry.event)
            .collect()
    }
}

/// The host: ledgers, contracts, a clock, and one-call-at-a-time execution.
#[derive(Clone, Debug)]
pub struct Chain {
    state: WorldState,
    now: Timestamp,
}

impl Chain {
    pub fn new(now: Timestamp) -> Self {
        Self {
            state: WorldState::default(),
            now,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn set_time(&mut self, now: Timestamp) {
        self.now = now;
    }

    pub fn advance(&mut self, secs: u64) {
        self.now = self.now.saturating_add(secs);
    }

    fn next_address(&mut self, deployer: &Address) -> Address {
        let nonce = self.state.nonces.entry(*deployer).or_insert(0);
        let address = Address::derive(deployer, *nonce);
        *nonce += 1;
        address
    }

    /// Deploy a ledger. The premine is credited without events.
    pub fn deploy_ledger(
        &mut self,
        deployer: Address,
        config: &LedgerConfig,
    ) -> Result<Address, ConfigError> {
        if let Some(source) = config.forward_source {
            if !self.state.ledgers.contains_key(&source) {
                return Err(ConfigError::Invalid(format!(
                    "forward_source {source} is not a deployed ledger"
                )));
            }
        }

        let address = self.next_address(&deployer);
        let ledger = Ledger::new(address, deployer, config, self.now)?;
        info!(
            ledger = %address,
            symbol = ledger.symbol(),
            owner = %ledger.owner(),
            total_supply = ledger.total_supply(),
            "Deployed ledger"
        );
        self.state.ledgers.insert(address, ledger);
        Ok(address)
    }

    /// Deploy a receiver contract built from its own address.
    pub fn deploy_contract<C, F>(&mut self, deployer: Address, build: F) -> Address
    where
        C: ReceiverContract + 'static,
        F: FnOnce(Address) -> C,
    {
        let address = self.next_address(&deployer);
        info!(contract = %address, %deployer, "Deployed receiver contract");
        self.state.contracts.insert(address, Box::new(build(address)));
        address
    }

    pub fn ledger(&self, address: &Address) -> Result<&Ledger, TokenError> {
        self.state
            .ledgers
            .get(address)
            .ok_or(TokenError::UnknownLedger(*address))
    }

    /// Inspect a deployed contract as its concrete type.
    pub fn contract<C: 'static>(&self, address: &Address) -> Result<&C, TokenError> {
        self.state
            .contracts
            .get(address)
            .and_then(|code| code.as_any().downcast_ref::<C>())
            .ok_or(TokenError::UnknownContract(*address))
    }

    /// Run one call from `sender`, committing all of its effects or none.
    pub fn execute<T, F>(&mut self, sender: Address, f: F) -> Result<Receipt<T>, TokenError>
    where
        F: FnOnce(&mut CallContext<'_>) -> Result<T, TokenError>,
    {
        let snapshot = self.state.clone();
        let outcome = {
            let mut ctx = CallContext::new(&mut self.state, self.now, sender);
            match f(&mut ctx) {
                Ok(value) => Ok((value, ctx.events)),
                Err(err) => Err(err),
            }
        };

        match outcome {
            Ok((value, events)) => {
                debug!(%sender, events = events.len(), "Call committed");
                Ok(Receipt { value, events })
            }
            Err(err) => {
                self.state = snapshot;
                warn!(%sender, error = %err, "Call reverted");
                Err(err)
            }
        }
    }
}

/// Where the credited funds come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Source {
    /// New supply. Only the mint schedule issues.
    Issue,
    /// Debited from an existing account.
    Account(Address),
}

impl Source {
    /// Address reported in `Transfer` events.
    pub fn address(&self) -> Address {
        match self {
            Source::Issue => Address::ZERO,
            Source::Account(account) => *account,
        }
    }
}

/// A credit flowing through the pipeline.
pub(crate) struct Delivery {
    pub token: Address,
    pub from: Source,
    pub to: Address,
    pub amount: Amount,
    /// Party the receiver hook is told paid.
    pub payer: Address,
    /// Emitted after the transfers, before the hook runs.
    pub notice: Option<Event>,
}

/// Forward resolution of one recipient.
pub(crate) struct Route {
    /// The recipient followed by every hop; the last entry is final.
    pub path: Vec<Address>,
    /// Accounts whose delegation was adopted from the linked ledger.
    pub adopted: Vec<Address>,
}

impl Route {
    pub fn recipient(&self) -> Address {
        self.path[self.path.len() - 1]
    }
}

/// Execution state of a single call.
pub struct CallContext<'a> {
    state: &'a mut WorldState,
    now: Timestamp,
    origin: Address,
    /// Contracts currently executing, innermost last.
    frames: Vec<Address>,
    active: BTreeSet<Address>,
    events: Vec<LogEntry>,
}

impl<'a> CallContext<'a> {
    fn new(state: &'a mut WorldState, now: Timestamp, origin: Address) -> Self {
        Self {
            state,
            now,
            origin,
            frames: Vec::new(),
            active: BTreeSet::new(),
            events: Vec::new(),
        }
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Account that submitted the call.
    pub fn origin(&self) -> Address {
        self.origin
    }

    /// Account performing the current operation: the innermost executing
    /// contract, or the origin.
    pub fn caller(&self) -> Address {
        self.frames.last().copied().unwrap_or(self.origin)
    }

    /// Events emitted so far in this call.
    pub fn events(&self) -> &[LogEntry] {
        &self.events
    }

    pub(crate) fn ledger(&self, token: &Address) -> Result<&Ledger, TokenError> {
        self.state
            .ledgers
            .get(token)
            .ok_or(TokenError::UnknownLedger(*token))
    }

    pub(crate) fn ledger_mut(&mut self, token: &Address) -> Result<&mut Ledger, TokenError> {
        self.state
            .ledgers
            .get_mut(token)
            .ok_or(TokenError::UnknownLedger(*token))
    }

    pub(crate) fn emit(&mut self, token: Address, event: Event) {
        self.events.push(LogEntry::new(token, event));
    }

    fn has_code(&self, address: &Address) -> bool {
        self.state.contracts.contains_key(address)
            || self.active.contains(address)
            || self.state.ledgers.contains_key(address)
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    pub fn balance_of(&self, token: &Address, account: &Address) -> Result<Amount, TokenError> {
        Ok(self.ledger(token)?.balance_of(account))
    }

    pub fn total_supply(&self, token: &Address) -> Result<Amount, TokenError> {
        Ok(self.ledger(token)?.total_supply())
    }

    pub fn name(&self, token: &Address) -> Result<&str, TokenError> {
        Ok(self.ledger(token)?.name())
    }

    pub fn symbol(&self, token: &Address) -> Result<&str, TokenError> {
        Ok(self.ledger(token)?.symbol())
    }

    pub fn decimals(&self, token: &Address) -> Result<u8, TokenError> {
        Ok(self.ledger(token)?.decimals())
    }

    pub fn owner(&self, token: &Address) -> Result<Address, TokenError> {
        Ok(self.ledger(token)?.owner())
    }

    pub fn allowance(
        &self,
        token: &Address,
        owner: &Address,
        spender: &Address,
    ) -> Result<Amount, TokenError> {
        Ok(self.ledger(token)?.allowance(owner, spender))
    }

    // ---------------------------------------------------------------------
    // Transfers
    // ---------------------------------------------------------------------

    /// Move `amount` from the caller to `to`.
    pub fn transfer(&mut self, token: Address, to: Address, amount: Amount) -> Result<(), TokenError> {
        let from = self.caller();
        self.deliver(Delivery {
            token,
            from: Source::Account(from),
            to,
            amount,
            payer: from,
            notice: None,
        })?;
        Ok(())
    }

    /// Let `spender` move up to `amount` of the caller's funds.
    pub fn approve(&mut self, token: Address, spender: Address, amount: Amount) -> Result<(), TokenError> {
        if spender.is_zero() {
            return Err(TokenError::InvalidRecipient(spender));
        }
        let owner = self.caller();
        self.ledger_mut(&token)?.set_allowance(owner, spender, amount);
        self.emit(
            token,
            Event::Approval {
                owner,
                spender,
                value: amount,
            },
        );
        Ok(())
    }

    /// Move `amount` from `owner` to `to` against the caller's allowance.
    pub fn transfer_from(
        &mut self,
        token: Address,
        owner: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let spender = self.caller();
        self.ledger_mut(&token)?
            .spend_allowance(&owner, &spender, amount)?;
        self.deliver(Delivery {
            token,
            from: Source::Account(owner),
            to,
            amount,
            payer: owner,
            notice: None,
        })?;
        Ok(())
    }

    pub fn transfer_ownership(&mut self, token: Address, new_owner: Address) -> Result<(), TokenError> {
        if new_owner.is_zero() {
            return Err(TokenError::InvalidRecipient(new_owner));
        }
        let caller = self.caller();
        let ledger = self.ledger_mut(&token)?;
        ledger.ensure_owner(&caller)?;
        ledger.set_owner(new_owner);
        info!(ledger = %token, previous = %caller, new = %new_owner, "Ownership transferred");
        self.emit(
            token,
            Event::OwnershipTransferred {
                previous: caller,
                new: new_owner,
            },
        );
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Credit pipeline
    // ---------------------------------------------------------------------

    /// Credit `delivery.to`, follow its forwards and run the final
    /// recipient's hook. Returns the final recipient.
    pub(crate) fn deliver(&mut self, delivery: Delivery) -> Result<Address, TokenError> {
        let Delivery {
            token,
            from,
            to,
            amount,
            payer,
            notice,
        } = delivery;

        if let Source::Account(account) = from {
            if account.is_zero() {
                return Err(TokenError::InvalidSender(account));
            }
        }
        if to.is_zero() {
            return Err(TokenError::InvalidRecipient(to));
        }
        let route = self.resolve(&token, to, true)?;
        let recipient = route.recipient();
        let has_hook = self.check_recipient(&token, &recipient)?;

        let ledger = self.ledger_mut(&token)?;
        match from {
            Source::Issue => ledger.issue(&to, amount)?,
            Source::Account(account) => ledger.move_balance(&account, &to, amount)?,
        }
        for hop in route.path.windows(2) {
            ledger.move_balance(&hop[0], &hop[1], amount)?;
        }

        let from = from.address();
        self.emit(token, Event::Transfer { from, to, value: amount });
        for hop in route.path.windows(2) {
            if route.adopted.contains(&hop[0]) {
                self.emit(token, Event::SetupAutoForward { address: hop[0] });
            }
            self.emit(
                token,
                Event::Transfer {
                    from: hop[0],
                    to: hop[1],
                    value: amount,
                },
            );
        }
        if let Some(notice) = notice {
            self.emit(token, notice);
        }
        debug!(
            ledger = %token,
            %from,
            %to,
            %recipient,
            hops = route.path.len() - 1,
            amount,
            "Credited"
        );

        if has_hook {
            self.enter_contract(recipient, |code, ctx| {
                code.on_receive(ctx, token, payer, amount)
            })?;
        }
        Ok(recipient)
    }

    /// Follow forward entries from `start` to the final recipient.
    ///
    /// With `adopt`, an account with no local entry that is delegated on the
    /// linked `forward_source` ledger is given an auto-forward entry here.
    pub(crate) fn resolve(
        &mut self,
        token: &Address,
        start: Address,
        adopt: bool,
    ) -> Result<Route, TokenError> {
        let mut route = Route {
            path: vec![start],
            adopted: Vec::new(),
        };
        let mut current = start;

        loop {
            let next = match self.next_hop(token, &current, adopt)? {
                Some((next, adopted)) => {
                    if adopted {
                        route.adopted.push(current);
                    }
                    next
                }
                None => break,
            };
            if route.path.contains(&next) {
                return Err(TokenError::ForwardCycle(start));
            }
            if route.path.len() > MAX_FORWARD_HOPS {
                return Err(TokenError::ForwardChainTooLong {
                    start,
                    max: MAX_FORWARD_HOPS,
                });
            }
            route.path.push(next);
            current = next;
        }
        Ok(route)
    }

    /// Next hop for `account`, and whether its delegation was just adopted.
    fn next_hop(
        &mut self,
        token: &Address,
        account: &Address,
        adopt: bool,
    ) -> Result<Option<(Address, bool)>, TokenError> {
        let ledger = self.ledger(token)?;
        if ledger.forwards.is_forwarded(account) {
            return Ok(ledger.forwards.next_hop(account).map(|next| (next, false)));
        }

        // Adopt only when the delegation can take effect immediately.
        let (Some(source), Some(receiver)) = (
            ledger.forward_source(),
            ledger.forwards.auto_forward_receiver(),
        ) else {
            return Ok(None);
        };
        if !adopt || !self.ledger(&source)?.forwards.is_forwarded(account) {
            return Ok(None);
        }

        self.ledger_mut(token)?
            .forwards
            .insert(*account, ForwardTarget::AutoForwardReceiver)?;
        info!(ledger = %token, %source, account = %account, "Adopted forward delegation");
        Ok(Some((receiver, true)))
    }

    /// Whether `recipient` may be credited on `token`, and whether it has a
    /// hook to run.
    fn check_recipient(&self, token: &Address, recipient: &Address) -> Result<bool, TokenError> {
        if recipient.is_zero() {
            return Err(TokenError::InvalidRecipient(*recipient));
        }
        let registered = self.ledger(token)?.receivers.contains(recipient);
        let is_contract = self.state.contracts.contains_key(recipient) || self.active.contains(recipient);

        match (registered, is_contract) {
            (true, true) => Ok(true),
            (true, false) => Err(TokenError::MissingReceiverCode(*recipient)),
            (false, _) if self.has_code(recipient) => {
                Err(TokenError::UnregisteredReceiver(*recipient))
            }
            (false, _) => Ok(false),
        }
    }

    // ---------------------------------------------------------------------
    // Contract dispatch
    // ---------------------------------------------------------------------

    /// Run `f` with the contract at `address` checked out and on the call
    /// stack. A contract cannot be entered again while it is executing.
    fn enter_contract<R>(
        &mut self,
        address: Address,
        f: impl FnOnce(&mut (dyn ReceiverContract + 'static), &mut Self) -> Result<R, TokenError>,
    ) -> Result<R, TokenError> {
        if self.active.contains(&address) {
            return Err(TokenError::Reentrancy(address));
        }
        if self.frames.len() >= MAX_CALL_DEPTH {
            return Err(TokenError::CallDepthExceeded(MAX_CALL_DEPTH));
        }
        let mut code = self
            .state
            .contracts
            .remove(&address)
            .ok_or(TokenError::UnknownContract(address))?;

        self.active.insert(address);
        self.frames.push(address);
        debug!(contract = %address, depth = self.frames.len(), "Entering contract");

        let result = f(code.as_mut(), self);

        self.frames.pop();
        self.active.remove(&address);
        self.state.contracts.insert(address, code);
        result
    }

    /// Call a method on a deployed contract of type `C`.
    ///
    /// `f` receives the contract, the context (in which the contract is now
    /// the caller) and the account that invoked it.
    pub fn call_contract<C, R, F>(&mut self, address: Address, f: F) -> Result<R, TokenError>
    where
        C: 'static,
        F: FnOnce(&mut C, &mut CallContext<'_>, Address) -> Result<R, TokenError>,
    {
        let invoker = self.caller();
        self.enter_contract(address, |code, ctx| {
            let contract = code
                .as_any_mut()
                .downcast_mut::<C>()
                .ok_or(TokenError::UnknownContract(address))?;
            f(contract, ctx, invoker)
        })
    }
}
