// Copyright (c) 2024 The Botho Foundation

//! Events emitted by ledgers, in call order.

use serde::{Deserialize, Serialize};

use crate::{Address, Amount};

/// A ledger event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Funds moved. Minted funds come from [`Address::ZERO`].
    Transfer {
        from: Address,
        to: Address,
        value: Amount,
    },

    Approval {
        owner: Address,
        spender: Address,
        value: Amount,
    },

    /// New supply released to the mint receiver.
    Mint { to: Address, amount: Amount },

    /// `address` now forwards everything it receives.
    SetupAutoForward { address: Address },

    /// `sender` paid `to` and attributed the payment to `from`.
    PayOnBehalf {
        sender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    },

    OwnershipTransferred { previous: Address, new: Address },
}

/// An event together with the ledger that emitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub emitter: Address,
    pub event: Event,
}

impl LogEntry {
    pub fn new(emitter: Address, event: Event) -> Self {
        Self { emitter, event }
    }
}
