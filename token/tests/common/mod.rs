// Copyright (c) 2024 The Botho Foundation
//
//! Common fixtures for ledger integration tests.
//!
//! Provides well-known accounts, deployed ledger setups and a handful of
//! receiver contracts used to probe hook behaviour.
//!
//! # Example
//!
//! ```ignore
//! use common::*;
//!
//! let mut setup = SaleSetup::deploy();
//! setup.chain.execute(A0, |ctx| ctx.transfer(setup.base, setup.sale, COIN)).unwrap();
//! ```

#![allow(dead_code)]

mod contracts;
mod fixtures;

pub use contracts::*;
pub use fixtures::*;
