//! Assets and identifier validation

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Display;
use tracing::debug;

use super::error::ResolveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Fiat,
    Crypto,
}

/// A canonical currency or crypto asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub identifier: String,
    pub name: String,
    pub kind: AssetKind,
}

impl Asset {
    pub fn new(identifier: &str, name: &str, kind: AssetKind) -> Self {
        Asset {
            identifier: identifier.to_string(),
            name: name.to_string(),
            kind,
        }
    }

    pub fn is_crypto(&self) -> bool {
        self.kind == AssetKind::Crypto
    }
}

impl Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.identifier)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InvalidIdentifier {
    /// The value was not a string; holds the name of the type that was found.
    NotAString { found: String },
    Empty,
}

/// A caller supplied identifier after type validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CurrencyIdentifier {
    Valid(String),
    Invalid(InvalidIdentifier),
}

impl CurrencyIdentifier {
    /// Rejects invalid identifiers with the matching contract violation.
    pub fn validated(&self) -> Result<&str, ResolveError> {
        match self {
            CurrencyIdentifier::Valid(id) => Ok(id),
            CurrencyIdentifier::Invalid(InvalidIdentifier::NotAString { found }) => {
                Err(ResolveError::InvalidIdentifierType {
                    found: found.clone(),
                })
            }
            CurrencyIdentifier::Invalid(InvalidIdentifier::Empty) => {
                Err(ResolveError::EmptyIdentifier)
            }
        }
    }
}

impl From<&str> for CurrencyIdentifier {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CurrencyIdentifier::Invalid(InvalidIdentifier::Empty)
        } else {
            CurrencyIdentifier::Valid(s.to_string())
        }
    }
}

impl From<String> for CurrencyIdentifier {
    fn from(s: String) -> Self {
        if s.is_empty() {
            CurrencyIdentifier::Invalid(InvalidIdentifier::Empty)
        } else {
            CurrencyIdentifier::Valid(s)
        }
    }
}

impl From<&Value> for CurrencyIdentifier {
    fn from(value: &Value) -> Self {
        let found = match value {
            Value::String(s) => return CurrencyIdentifier::from(s.as_str()),
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        };
        CurrencyIdentifier::Invalid(InvalidIdentifier::NotAString {
            found: found.to_string(),
        })
    }
}

impl From<Value> for CurrencyIdentifier {
    fn from(value: Value) -> Self {
        CurrencyIdentifier::from(&value)
    }
}

/// Maps raw identifiers to canonical assets.
pub trait AssetResolver: Send + Sync {
    fn resolve(&self, identifier: &str) -> Result<Asset, ResolveError>;
}

const BUILTIN_ASSETS: &[(&str, &str, AssetKind)] = &[
    ("USD", "United States Dollar", AssetKind::Fiat),
    ("EUR", "Euro", AssetKind::Fiat),
    ("GBP", "British Pound", AssetKind::Fiat),
    ("JPY", "Japanese Yen", AssetKind::Fiat),
    ("CHF", "Swiss Franc", AssetKind::Fiat),
    ("CNY", "Chinese Yuan", AssetKind::Fiat),
    ("KRW", "South Korean Won", AssetKind::Fiat),
    ("INR", "Indian Rupee", AssetKind::Fiat),
    ("CAD", "Canadian Dollar", AssetKind::Fiat),
    ("AUD", "Australian Dollar", AssetKind::Fiat),
    ("NZD", "New Zealand Dollar", AssetKind::Fiat),
    ("SEK", "Swedish Krona", AssetKind::Fiat),
    ("NOK", "Norwegian Krone", AssetKind::Fiat),
    ("DKK", "Danish Krone", AssetKind::Fiat),
    ("PLN", "Polish Zloty", AssetKind::Fiat),
    ("BRL", "Brazilian Real", AssetKind::Fiat),
    ("MXN", "Mexican Peso", AssetKind::Fiat),
    ("SGD", "Singapore Dollar", AssetKind::Fiat),
    ("HKD", "Hong Kong Dollar", AssetKind::Fiat),
    ("TRY", "Turkish Lira", AssetKind::Fiat),
    ("ZAR", "South African Rand", AssetKind::Fiat),
    ("BTC", "Bitcoin", AssetKind::Crypto),
    ("ETH", "Ethereum", AssetKind::Crypto),
    ("SOL", "Solana", AssetKind::Crypto),
    ("ADA", "Cardano", AssetKind::Crypto),
    ("DOT", "Polkadot", AssetKind::Crypto),
    ("LTC", "Litecoin", AssetKind::Crypto),
    ("XRP", "XRP", AssetKind::Crypto),
    ("DOGE", "Dogecoin", AssetKind::Crypto),
    ("DAI", "Dai", AssetKind::Crypto),
    ("USDC", "USD Coin", AssetKind::Crypto),
];

/// In-memory asset registry seeded with common fiat and crypto assets.
#[derive(Debug, Clone)]
pub struct AssetRegistry {
    assets: HashMap<String, Asset>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        let assets = BUILTIN_ASSETS
            .iter()
            .map(|(id, name, kind)| (id.to_string(), Asset::new(id, name, *kind)))
            .collect();
        AssetRegistry { assets }
    }

    /// Adds or replaces assets, e.g. from configuration.
    pub fn with_assets(mut self, extra: impl IntoIterator<Item = Asset>) -> Self {
        for asset in extra {
            debug!(asset = %asset.identifier, "Registering asset");
            self.assets.insert(asset.identifier.clone(), asset);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl Default for AssetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetResolver for AssetRegistry {
    fn resolve(&self, identifier: &str) -> Result<Asset, ResolveError> {
        self.assets
            .get(identifier)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownAsset(identifier.to_string()))
    }
}
