// Copyright (c) 2024 The Botho Foundation

//! Ledger genesis configuration.
//!
//! Amounts are given in whole coins and scaled by `10^decimals` when the
//! ledger is deployed:
//!
//! ```toml
//! name = "SGO"
//! symbol = "SGO"
//! premine = 179000000
//! mint_cap = 21000000
//! half_mint_period_secs = 126144000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Address, Amount};

/// Four 365-day years, in seconds.
pub const FOUR_YEARS_SECS: u64 = 60 * 60 * 24 * 365 * 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Genesis parameters of one ledger instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub name: String,

    pub symbol: String,

    #[serde(default = "default_decimals")]
    pub decimals: u8,

    /// Ledger owner. Defaults to the deployer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Address>,

    /// Whole coins credited to the owner at deployment.
    pub premine: u64,

    /// Whole coins the mint schedule may ever release.
    #[serde(default)]
    pub mint_cap: u64,

    /// Time after which half of the mint cap is released.
    #[serde(default = "default_half_mint_period")]
    pub half_mint_period_secs: u64,

    /// Ledger whose forward delegations this ledger adopts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_source: Option<Address>,
}

fn default_decimals() -> u8 {
    18
}

fn default_half_mint_period() -> u64 {
    FOUR_YEARS_SECS
}

impl LedgerConfig {
    /// The SGO token: 179M premined, 21M released over time.
    pub fn sgo() -> Self {
        Self {
            name: "SGO".to_string(),
            symbol: "SGO".to_string(),
            decimals: default_decimals(),
            owner: None,
            premine: 179_000_000,
            mint_cap: 21_000_000,
            half_mint_period_secs: FOUR_YEARS_SECS,
            forward_source: None,
        }
    }

    /// The CGO token: 17.9M premined, 2.1M released over time.
    pub fn cgo() -> Self {
        Self {
            name: "CGO".to_string(),
            symbol: "CGO".to_string(),
            premine: 17_900_000,
            mint_cap: 2_100_000,
            ..Self::sgo()
        }
    }

    /// A fixed-supply reward ledger linked to `forward_source` for
    /// forward delegations.
    pub fn sub_token(symbol: &str, premine: u64, forward_source: Address) -> Self {
        Self {
            name: format!("{symbol} sub token"),
            symbol: symbol.to_string(),
            decimals: default_decimals(),
            owner: None,
            premine,
            mint_cap: 0,
            half_mint_period_secs: FOUR_YEARS_SECS,
            forward_source: Some(forward_source),
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// One whole coin in base units.
    pub fn coin(&self) -> Result<Amount, ConfigError> {
        10u128
            .checked_pow(self.decimals as u32)
            .ok_or_else(|| ConfigError::Invalid(format!("decimals {} too large", self.decimals)))
    }

    pub fn premine_units(&self) -> Result<Amount, ConfigError> {
        self.scale(self.premine, "premine")
    }

    pub fn mint_cap_units(&self) -> Result<Amount, ConfigError> {
        self.scale(self.mint_cap, "mint_cap")
    }

    fn scale(&self, coins: u64, field: &str) -> Result<Amount, ConfigError> {
        (coins as Amount)
            .checked_mul(self.coin()?)
            .ok_or_else(|| ConfigError::Invalid(format!("{field} overflows at {} decimals", self.decimals)))
    }

    /// Check that every derived quantity is representable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.is_empty() {
            return Err(ConfigError::Invalid("symbol must not be empty".to_string()));
        }

        let premine = self.premine_units()?;
        let cap = self.mint_cap_units()?;
        premine
            .checked_add(cap)
            .ok_or_else(|| ConfigError::Invalid("premine + mint_cap overflows".to_string()))?;

        if cap > 0 {
            if self.half_mint_period_secs == 0 {
                return Err(ConfigError::Invalid(
                    "half_mint_period_secs must be positive when minting".to_string(),
                ));
            }
            // The release curve multiplies the cap by the half period once.
            cap.checked_mul(self.half_mint_period_secs as Amount)
                .ok_or_else(|| {
                    ConfigError::Invalid("mint_cap × half_mint_period overflows".to_string())
                })?;
        }

        if self.forward_source.is_some_and(|a| a.is_zero()) {
            return Err(ConfigError::Invalid("forward_source must not be zero".to_string()));
        }

        Ok(())
    }
}
