use std::{cmp::Ordering, fmt::Display, num::ParseFloatError, str::FromStr};

use getset::{CopyGetters, Getters};

/// One row of the emissions table: a country and its share of world CO2 emissions.
#[derive(Clone, PartialEq, Debug, Getters, CopyGetters)]
pub struct Record {
    #[getset(get = "pub")]
    country: CountryName,
    #[getset(get_copy = "pub")]
    percentage: Percentage,
}
impl Record {
    pub fn new(country: CountryName, percentage: Percentage) -> Self {
        Self {
            country,
            percentage,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug, derive_more::From, derive_more::Display)]
pub struct CountryName(String);
impl CountryName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl From<&str> for CountryName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Percentage of world emissions, e.g. `29.34` for a cell reading `29.34%`.
///
/// Displays in the same plain-number form it was parsed from.
#[derive(Clone, Copy, PartialEq, PartialOrd, Debug)]
pub struct Percentage(f64);
impl Percentage {
    pub fn get(self) -> f64 {
        self.0
    }

    /// Total order on the underlying float; values are always finite.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}
impl TryFrom<f64> for Percentage {
    type Error = PercentageParseError;
    fn try_from(v: f64) -> Result<Self, Self::Error> {
        if v.is_finite() {
            Ok(Self(v))
        } else {
            Err(PercentageParseError::NotFinite(v))
        }
    }
}
impl From<Percentage> for f64 {
    fn from(p: Percentage) -> Self {
        p.0
    }
}
impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}
impl FromStr for Percentage {
    type Err = PercentageParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_suffix('%').unwrap_or(s).trim_end();
        if s.is_empty() {
            return Err(PercentageParseError::Empty);
        }
        let v: f64 = s
            .parse()
            .map_err(|e| PercentageParseError::NotANumber(s.to_owned(), e))?;
        v.try_into()
    }
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum PercentageParseError {
    #[error("The percentage cell is empty")]
    Empty,
    #[error("{0:?} is not a number: {1}")]
    NotANumber(String, ParseFloatError),
    #[error("{0} is not a finite percentage")]
    NotFinite(f64),
}
