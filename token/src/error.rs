// Copyright (c) 2024 The Botho Foundation

use std::fmt;

use thiserror::Error;

use crate::{Address, Amount};

/// Privileged roles checked by ledger operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    MintManager,
    PaymentToken,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Owner => write!(f, "owner"),
            Role::MintManager => write!(f, "mint manager"),
            Role::PaymentToken => write!(f, "payment token"),
        }
    }
}

/// Reasons a call is reverted. Any error discards every effect of the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Insufficient balance for {account}: have {available}, need {requested}")]
    InsufficientBalance {
        account: Address,
        available: Amount,
        requested: Amount,
    },

    #[error("Insufficient allowance for {spender}: have {available}, need {requested}")]
    InsufficientAllowance {
        spender: Address,
        available: Amount,
        requested: Amount,
    },

    #[error("{caller} is not the {role}")]
    Unauthorized { caller: Address, role: Role },

    #[error("{0} is not a registered receiver contract")]
    UnregisteredReceiver(Address),

    #[error("Registered receiver {0} has no contract code")]
    MissingReceiverCode(Address),

    #[error("Invalid recipient {0}")]
    InvalidRecipient(Address),

    #[error("Invalid sender {0}")]
    InvalidSender(Address),

    #[error("Forward signature does not authorize the account")]
    InvalidSignature,

    #[error("{0} already has a forward")]
    AlreadyForwarded(Address),

    #[error("Forwarding from {0} loops back on itself")]
    ForwardCycle(Address),

    #[error("Forwarding from {start} exceeds {max} hops")]
    ForwardChainTooLong { start: Address, max: usize },

    #[error("Nothing to mint")]
    NothingToMint,

    #[error("Minting {requested} would exceed the mint cap of {cap}")]
    MintCapExceeded { cap: Amount, requested: Amount },

    #[error("Reentrant call into {0}")]
    Reentrancy(Address),

    #[error("Call depth limit of {0} exceeded")]
    CallDepthExceeded(usize),

    #[error("No ledger deployed at {0}")]
    UnknownLedger(Address),

    #[error("No contract deployed at {0}")]
    UnknownContract(Address),

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
}
