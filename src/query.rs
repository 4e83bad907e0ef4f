use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};

use crate::error::ConfigError;

pub const BACKEND_KEY: &str = "backend";
pub const RESOURCE_KEY: &str = "resource";
pub const WILDCARD: &str = "all";

static MATCH_ALL: Selector = Selector::All;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    All,
    Values(BTreeSet<String>),
}

impl Selector {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::All => true,
            Self::Values(values) => values.contains(value),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::All)
    }

    fn merge(&mut self, other: Selector) {
        match other {
            Self::All => *self = Self::All,
            Self::Values(extra) => {
                if let Self::Values(current) = self {
                    current.extend(extra);
                }
            }
        }
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "{WILDCARD}"),
            Self::Values(values) => {
                let quoted = values
                    .iter()
                    .map(|value| shlex::try_quote(value))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| std::fmt::Error)?;
                write!(f, "{}", quoted.join(","))
            }
        }
    }
}

/// Backend and resource-type filter driving one listing.
///
/// Keys that are absent match everything. Unknown keys are kept so a newer
/// query string still parses, but nothing consults them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    filters: BTreeMap<String, Selector>,
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let tokens =
            shlex::split(input).ok_or_else(|| ConfigError::UnbalancedQuotes(input.to_string()))?;

        let mut query = Self::default();
        for token in tokens {
            let Some((key, raw_values)) = token.split_once('=') else {
                return Err(ConfigError::MalformedToken(token));
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigError::EmptyKey(token));
            }

            let values = raw_values
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .collect::<BTreeSet<_>>();
            if values.is_empty() {
                return Err(ConfigError::EmptyValues(token));
            }

            let selector = if values.contains(WILDCARD) {
                Selector::All
            } else {
                Selector::Values(values)
            };

            match query.filters.get_mut(key) {
                Some(existing) => existing.merge(selector),
                None => {
                    query.filters.insert(key.to_string(), selector);
                }
            }
        }

        Ok(query)
    }

    pub fn selector(&self, key: &str) -> &Selector {
        self.filters.get(key).unwrap_or(&MATCH_ALL)
    }

    pub fn matches(&self, key: &str, value: &str) -> bool {
        self.selector(key).matches(value)
    }

    pub fn backends(&self) -> &Selector {
        self.selector(BACKEND_KEY)
    }

    pub fn resources(&self) -> &Selector {
        self.selector(RESOURCE_KEY)
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.filters.is_empty() {
            return write!(f, "{BACKEND_KEY}={WILDCARD} {RESOURCE_KEY}={WILDCARD}");
        }

        let rendered = self
            .filters
            .iter()
            .map(|(key, selector)| {
                let key = shlex::try_quote(key).map_err(|_| std::fmt::Error)?;
                Ok(format!("{key}={selector}"))
            })
            .collect::<Result<Vec<_>, std::fmt::Error>>()?
            .join(" ");
        write!(f, "{rendered}")
    }
}
