// Copyright (c) 2024 The Botho Foundation

//! Programmable value-transfer ledgers.
//!
//! A [`Ledger`] tracks balances of one fungible unit and releases new supply
//! on a hyperbolic schedule ([`MintScheduler`]). Accounts can delegate all
//! funds they receive to another address with a secp256k1 signature
//! ([`ForwardRegistry`]). Registered [`ReceiverContract`]s react to incoming
//! payments, for example the [`CashbackSale`], which pays a reward in a
//! companion ledger.
//!
//! All state lives in a [`Chain`]. Every call runs atomically through
//! [`Chain::execute`]:
//!
//! ```
//! use sgo_token::{Address, Chain, LedgerConfig};
//!
//! let owner = Address::new([1; 20]);
//! let alice = Address::new([2; 20]);
//!
//! let mut chain = Chain::new(1_500_000_000);
//! let sgo = chain.deploy_ledger(owner, &LedgerConfig::sgo()).unwrap();
//!
//! let receipt = chain
//!     .execute(owner, |ctx| ctx.transfer(sgo, alice, 1_000))
//!     .unwrap();
//! assert_eq!(receipt.events.len(), 1);
//! assert_eq!(chain.ledger(&sgo).unwrap().balance_of(&alice), 1_000);
//! ```

mod address;
mod error;

pub mod config;
pub mod event;
pub mod forward;
pub mod ledger;
pub mod mint;
mod payment;
pub mod receiver;
pub mod runtime;
pub mod sale;

pub use address::{Address, AddressParseError};
pub use config::{ConfigError, LedgerConfig};
pub use error::{Role, TokenError};
pub use event::{Event, LogEntry};
pub use forward::{
    forward_digest, verify_forward_authorization, ForwardRegistry, ForwardTarget,
    FORWARD_MESSAGE_PREFIX, MAX_FORWARD_HOPS,
};
pub use ledger::Ledger;
pub use mint::MintScheduler;
pub use receiver::{ReceiverContract, ReceiverHookRegistry};
pub use runtime::{CallContext, Chain, Receipt, MAX_CALL_DEPTH};
pub use sale::{CashbackSale, BPS_DENOMINATOR};

pub use sgo_crypto_secp256k1::{RecoverableSignature, Secp256k1Keypair};

/// Balance in base units.
pub type Amount = u128;

/// Seconds since the Unix epoch.
pub type Timestamp = u64;
