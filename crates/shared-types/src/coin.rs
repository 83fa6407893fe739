//! Coin domains and price-point keys.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three native coin domains of the chain.
///
/// Fees may be declared in any of them; the priority selector normalizes fee
/// value through the oracle median price of the declaring coin.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum CoinType {
    /// The base coin (block rewards, delegate votes).
    #[default]
    Base,
    /// The fund coin (governance / risk reserve).
    Fund,
    /// The price-stable coin; always valued at 1 against itself.
    Stable,
}

impl fmt::Display for CoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoinType::Base => write!(f, "base"),
            CoinType::Fund => write!(f, "fund"),
            CoinType::Stable => write!(f, "stable"),
        }
    }
}

impl std::str::FromStr for CoinType {
    type Err = ParseCoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base" => Ok(CoinType::Base),
            "fund" => Ok(CoinType::Fund),
            "stable" => Ok(CoinType::Stable),
            other => Err(ParseCoinError(other.to_string())),
        }
    }
}

/// Error parsing a coin domain or price pair from its string form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseCoinError(pub String);

impl fmt::Display for ParseCoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown coin token: {}", self.0)
    }
}

impl std::error::Error for ParseCoinError {}

/// Key of one oracle median price point: the priced coin and its quote coin.
///
/// Serializes as the `"coin/quote"` string so price-point maps stay valid
/// JSON objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CoinPricePair {
    /// The coin being priced.
    pub coin: CoinType,
    /// The coin the price is quoted in.
    pub quote: CoinType,
}

impl CoinPricePair {
    /// Creates a price-pair key.
    pub fn new(coin: CoinType, quote: CoinType) -> Self {
        Self { coin, quote }
    }
}

impl fmt::Display for CoinPricePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.coin, self.quote)
    }
}

impl std::str::FromStr for CoinPricePair {
    type Err = ParseCoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (coin, quote) = s
            .split_once('/')
            .ok_or_else(|| ParseCoinError(s.to_string()))?;
        Ok(Self {
            coin: coin.parse()?,
            quote: quote.parse()?,
        })
    }
}

impl Serialize for CoinPricePair {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CoinPricePair {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
