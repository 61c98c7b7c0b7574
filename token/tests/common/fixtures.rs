// Copyright (c) 2024 The Botho Foundation

use sgo_token::{
    forward_digest, Address, Amount, CashbackSale, Chain, Event, LedgerConfig, LogEntry,
    RecoverableSignature, Secp256k1Keypair, Timestamp, BPS_DENOMINATOR,
};

/// One whole coin at 18 decimals.
pub const COIN: Amount = 1_000_000_000_000_000_000;

pub const START: Timestamp = 1_500_000_000;

pub const HALF_MINT_PERIOD: u64 = 60 * 60 * 24 * 365 * 4;

/// Deployer and owner of every ledger.
pub const A0: Address = Address::new([0xa0; 20]);
pub const A1: Address = Address::new([0xa1; 20]);
pub const A2: Address = Address::new([0xa2; 20]);
pub const A3: Address = Address::new([0xa3; 20]);

/// The key `0x00..01`, used as the forwarded account.
pub fn forward_key() -> Secp256k1Keypair {
    key(1)
}

pub fn key(n: u8) -> Secp256k1Keypair {
    let mut bytes = [0u8; 32];
    bytes[31] = n;
    Secp256k1Keypair::from_bytes(&bytes).unwrap()
}

pub fn address_of(key: &Secp256k1Keypair) -> Address {
    Address::new(key.address())
}

/// Auto-forward authorization signed by `key` for `ledger`.
pub fn sign_auto_forward(key: &Secp256k1Keypair, ledger: &Address) -> RecoverableSignature {
    key.sign_hash(&forward_digest(ledger, None)).unwrap()
}

/// Explicit-target authorization signed by `key` for `ledger`.
pub fn sign_forward(key: &Secp256k1Keypair, ledger: &Address, to: &Address) -> RecoverableSignature {
    key.sign_hash(&forward_digest(ledger, Some(to))).unwrap()
}

/// A chain at [`START`] with the SGO ledger deployed by [`A0`].
pub fn deploy_sgo() -> (Chain, Address) {
    let mut chain = Chain::new(START);
    let sgo = chain.deploy_ledger(A0, &LedgerConfig::sgo()).unwrap();
    (chain, sgo)
}

/// Base ledger, a cashback sale paying 10× in a linked sub ledger, and the
/// sub ledger's 1000 coins moved into the sale.
///
/// The sale is registered on the sub ledger (so it can be funded) but not yet
/// on the base ledger.
pub struct SaleSetup {
    pub chain: Chain,
    pub base: Address,
    pub sub: Address,
    pub sale: Address,
}

impl SaleSetup {
    pub fn deploy() -> Self {
        let (mut chain, base) = deploy_sgo();
        let sale = chain.deploy_contract(A0, |address| {
            CashbackSale::new(address, A0, base, 10 * BPS_DENOMINATOR)
        });
        let sub = chain
            .deploy_ledger(A0, &LedgerConfig::sub_token("SGOS", 1_000, base))
            .unwrap();

        chain
            .execute(A0, |ctx| {
                ctx.call_contract::<CashbackSale, _, _>(sale, |sale, _, caller| {
                    sale.set_reward_token(caller, sub)
                })?;
                ctx.register_receiver_contract(sub, sale)?;
                ctx.transfer(sub, sale, 1_000 * COIN)
            })
            .unwrap();

        Self {
            chain,
            base,
            sub,
            sale,
        }
    }

    pub fn register_sale(&mut self) {
        let (base, sale) = (self.base, self.sale);
        self.chain
            .execute(A0, |ctx| ctx.register_receiver_contract(base, sale))
            .unwrap();
    }

    pub fn balance(&self, ledger: Address, account: Address) -> Amount {
        self.chain.ledger(&ledger).unwrap().balance_of(&account)
    }
}

pub fn transfer(from: Address, to: Address, value: Amount) -> Event {
    Event::Transfer { from, to, value }
}

/// `(emitter, event)` pairs, for comparing whole event logs.
pub fn log(events: &[LogEntry]) -> Vec<(Address, Event)> {
    events
        .iter()
        .map(|entry| (entry.emitter, entry.event.clone()))
        .collect()
}

/// Assert the ledger's balances add up to its total supply.
pub fn assert_supply_consistent(chain: &Chain, ledger: &Address) {
    let ledger = chain.ledger(ledger).unwrap();
    assert_eq!(
        ledger.sum_of_balances(),
        ledger.total_supply(),
        "balances must sum to total supply"
    );
}
