use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Orthogonal product line: sports betting or equity/crypto trading.
///
/// Used to partition logs, schedules, storage slices and model versions
/// (see the GLOSSARY entry for `Domain`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Betting,
    Trading,
}

impl Domain {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Domain::Betting => "betting",
            Domain::Trading => "trading",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by [`Domain::from_str`] for an unrecognised domain string.
#[derive(Debug, thiserror::Error)]
#[error("unknown domain: {0}")]
pub struct UnknownDomain(String);

impl FromStr for Domain {
    type Err = UnknownDomain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "betting" => Ok(Domain::Betting),
            "trading" => Ok(Domain::Trading),
            other => Err(UnknownDomain(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for domain in [Domain::Betting, Domain::Trading] {
            assert_eq!(domain.as_str().parse::<Domain>().unwrap(), domain);
        }
    }
}
