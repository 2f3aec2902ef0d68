//! Request envelope accepted by the query interface.

use serde::Deserialize;
use serde_json::Value;

use super::asset::CurrencyIdentifier;
use super::task::ExecutionMode;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Currencies {
    List(Vec<Value>),
    /// Comma separated form used by query arguments
    Joined(String),
}

impl Default for Currencies {
    fn default() -> Self {
        Currencies::List(Vec::new())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RateQueryRequest {
    #[serde(default)]
    currencies: Currencies,
    #[serde(default)]
    pub async_query: bool,
}

impl RateQueryRequest {
    pub fn new(currencies: Vec<Value>, async_query: bool) -> Self {
        Self {
            currencies: Currencies::List(currencies),
            async_query,
        }
    }

    pub fn from_json(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }

    pub fn mode(&self) -> ExecutionMode {
        ExecutionMode::from_async_flag(self.async_query)
    }

    pub fn identifiers(&self) -> Vec<CurrencyIdentifier> {
        match &self.currencies {
            Currencies::List(values) => values.iter().map(CurrencyIdentifier::from).collect(),
            Currencies::Joined(joined) if joined.is_empty() => Vec::new(),
            Currencies::Joined(joined) => joined
                .split(',')
                .map(|s| CurrencyIdentifier::from(s.trim()))
                .collect(),
        }
    }
}
