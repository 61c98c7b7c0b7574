// Copyright (c) 2024 The Botho Foundation

//! Balance table of one fungible unit.
//!
//! A [`Ledger`] is plain state. Cross-ledger behaviour (forward resolution,
//! receiver hooks, atomicity) is driven by [`crate::CallContext`]; the methods
//! here only keep `sum(balances) == total_supply`.

use std::collections::BTreeMap;

use crate::{
    config::{ConfigError, LedgerConfig},
    forward::ForwardRegistry,
    mint::MintScheduler,
    receiver::ReceiverHookRegistry,
    Address, Amount, Role, Timestamp, TokenError,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ledger {
    address: Address,
    name: String,
    symbol: String,
    decimals: u8,
    owner: Address,
    balances: BTreeMap<Address, Amount>,
    allowances: BTreeMap<(Address, Address), Amount>,
    total_supply: Amount,
    forward_source: Option<Address>,
    pub(crate) mint: MintScheduler,
    pub(crate) forwards: ForwardRegistry,
    pub(crate) receivers: ReceiverHookRegistry,
}

impl Ledger {
    /// Create a ledger at `address`, crediting the premine to the owner
    /// (`config.owner`, or `deployer` when unset).
    pub fn new(
        address: Address,
        deployer: Address,
        config: &LedgerConfig,
        now: Timestamp,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let owner = config.owner.unwrap_or(deployer);
        let premine = config.premine_units()?;

        let mut balances = BTreeMap::new();
        if premine > 0 {
            balances.insert(owner, premine);
        }

        Ok(Self {
            address,
            name: config.name.clone(),
            symbol: config.symbol.clone(),
            decimals: config.decimals,
            owner,
            balances,
            allowances: BTreeMap::new(),
            total_supply: premine,
            forward_source: config.forward_source,
            mint: MintScheduler::new(
                config.mint_cap_units()?,
                config.half_mint_period_secs,
                now,
            ),
            forwards: ForwardRegistry::new(),
            receivers: ReceiverHookRegistry::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    /// Ledger whose forward delegations this ledger adopts.
    pub fn forward_source(&self) -> Option<Address> {
        self.forward_source
    }

    pub fn mint_scheduler(&self) -> &MintScheduler {
        &self.mint
    }

    pub fn forward_registry(&self) -> &ForwardRegistry {
        &self.forwards
    }

    pub fn receiver_registry(&self) -> &ReceiverHookRegistry {
        &self.receivers
    }

    /// Accounts with a non-zero balance.
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.balances.iter()
    }

    /// Sum of all balances; equals `total_supply` in every committed state.
    pub fn sum_of_balances(&self) -> Amount {
        self.balances.values().sum()
    }

    pub(crate) fn ensure_owner(&self, caller: &Address) -> Result<(), TokenError> {
        if *caller != self.owner {
            return Err(TokenError::Unauthorized {
                caller: *caller,
                role: Role::Owner,
            });
        }
        Ok(())
    }

    pub(crate) fn set_owner(&mut self, owner: Address) {
        self.owner = owner;
    }

    /// Move `amount` from `from` to `to`.
    pub(crate) fn move_balance(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                account: *from,
                available,
                requested: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::ArithmeticOverflow)?;

        self.set_balance(*from, available - amount);
        self.set_balance(*to, credited);
        Ok(())
    }

    /// Create `amount` of new supply in `to`.
    pub(crate) fn issue(&mut self, to: &Address, amount: Amount) -> Result<(), TokenError> {
        let total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::ArithmeticOverflow)?;
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::ArithmeticOverflow)?;

        self.total_supply = total_supply;
        self.set_balance(*to, credited);
        Ok(())
    }

    pub(crate) fn set_allowance(&mut self, owner: Address, spender: Address, amount: Amount) {
        if amount == 0 {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), amount);
        }
    }

    /// Consume `amount` of the allowance `owner` granted `spender`.
    pub(crate) fn spend_allowance(
        &mut self,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let available = self.allowance(owner, spender);
        if available < amount {
            return Err(TokenError::InsufficientAllowance {
                spender: *spender,
                available,
                requested: amount,
            });
        }
        self.set_allowance(*owner, *spender, available - amount);
        Ok(())
    }

    fn set_balance(&mut self, account: Address, balance: Amount) {
        if balance == 0 {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, balance);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: Address = Address::new([1; 20]);
    const ALICE: Address = Address::new([2; 20]);

    fn ledger() -> Ledger {
        let config = LedgerConfig {
            premine: 1_000,
            decimals: 0,
            ..LedgerConfig::cgo()
        };
        Ledger::new(Address::new([0xee; 20]), OWNER, &config, 0).unwrap()
    }

    #[test]
    fn test_premine_goes_to_owner() {
        let ledger = ledger();
        assert_eq!(ledger.owner(), OWNER);
        assert_eq!(ledger.balance_of(&OWNER), 1_000);
        assert_eq!(ledger.total_supply(), 1_000);
        assert_eq!(ledger.symbol(), "CGO");
    }

    #[test]
    fn test_configured_owner_overrides_deployer() {
        let config = LedgerConfig {
            owner: Some(ALICE),
            ..LedgerConfig::sgo()
        };
        let ledger = Ledger::new(Address::new([0xee; 20]), OWNER, &config, 0).unwrap();
        assert_eq!(ledger.owner(), ALICE);
        assert_eq!(ledger.balance_of(&OWNER), 0);
        assert_eq!(ledger.balance_of(&ALICE), ledger.total_supply());
    }

    #[test]
    fn test_move_balance() {
        let mut ledger = ledger();
        ledger.move_balance(&OWNER, &ALICE, 400).unwrap();
        assert_eq!(ledger.balance_of(&OWNER), 600);
        assert_eq!(ledger.balance_of(&ALICE), 400);
        assert_eq!(ledger.sum_of_balances(), ledger.total_supply());

        assert_eq!(
            ledger.move_balance(&ALICE, &OWNER, 401),
            Err(TokenError::InsufficientBalance {
                account: ALICE,
                available: 400,
                requested: 401
            })
        );
    }

    #[test]
    fn test_self_move_is_noop() {
        let mut ledger = ledger();
        ledger.move_balance(&OWNER, &OWNER, 1_000).unwrap();
        assert_eq!(ledger.balance_of(&OWNER), 1_000);
    }

    #[test]
    fn test_issue_grows_supply() {
        let mut ledger = ledger();
        ledger.issue(&ALICE, 50).unwrap();
        assert_eq!(ledger.total_supply(), 1_050);
        assert_eq!(ledger.sum_of_balances(), 1_050);
    }

    #[test]
    fn test_allowance_accounting() {
        let mut ledger = ledger();
        ledger.set_allowance(OWNER, ALICE, 100);
        ledger.spend_allowance(&OWNER, &ALICE, 60).unwrap();
        assert_eq!(ledger.allowance(&OWNER, &ALICE), 40);
        assert!(matches!(
            ledger.spend_allowance(&OWNER, &ALICE, 41),
            Err(TokenError::InsufficientAllowance { .. })
        ));
    }

    #[test]
    fn test_owner_check() {
        let ledger = ledger();
        ledger.ensure_owner(&OWNER).unwrap();
        assert_eq!(
            ledger.ensure_owner(&ALICE),
            Err(TokenError::Unauthorized {
                caller: ALICE,
                role: Role::Owner
            })
        );
    }
}
