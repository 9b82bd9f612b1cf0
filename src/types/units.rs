//! Unit Conversion Utilities
//!
//! Bitcoin amounts are counted in BTC, mBTC and SATOSHI. Bytom and Vapor
//! amounts of the BTM asset are counted in BTM, mBTM and NEU. Both families
//! share the same factors and the last unit of each is the base unit that
//! transactions carry.

use std::fmt;
use std::str::FromStr;

use crate::common::{Chain, Result, SwapError};

/// Base units per whole coin (satoshi per BTC, NEU per BTM)
pub const BASE_PER_COIN: u64 = 100_000_000;

/// Amount unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Btc,
    MilliBtc,
    Satoshi,
    Btm,
    MilliBtm,
    Neu,
}

impl Unit {
    /// How many of this unit make one whole coin
    pub fn factor(&self) -> f64 {
        match self {
            Unit::Btc | Unit::Btm => 1.0,
            Unit::MilliBtc | Unit::MilliBtm => 1_000.0,
            Unit::Satoshi | Unit::Neu => BASE_PER_COIN as f64,
        }
    }

    pub fn is_base(&self) -> bool {
        matches!(self, Unit::Satoshi | Unit::Neu)
    }

    fn is_bitcoin(&self) -> bool {
        matches!(self, Unit::Btc | Unit::MilliBtc | Unit::Satoshi)
    }

    /// Base unit of a chain (SATOSHI or NEU)
    pub fn base(chain: Chain) -> Unit {
        match chain {
            Chain::Bitcoin => Unit::Satoshi,
            Chain::Bytom | Chain::Vapor => Unit::Neu,
        }
    }

    /// Parse a unit name that belongs to `chain`
    pub fn parse_for(unit: &str, chain: Chain) -> Result<Unit> {
        let parsed: Unit = unit.parse()?;
        if parsed.is_bitcoin() == (chain == Chain::Bitcoin) {
            Ok(parsed)
        } else {
            Err(unit_error(unit, chain))
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Unit::Btc => "BTC",
            Unit::MilliBtc => "mBTC",
            Unit::Satoshi => "SATOSHI",
            Unit::Btm => "BTM",
            Unit::MilliBtm => "mBTM",
            Unit::Neu => "NEU",
        };
        f.write_str(name)
    }
}

impl FromStr for Unit {
    type Err = SwapError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "BTC" => Ok(Unit::Btc),
            "mBTC" => Ok(Unit::MilliBtc),
            "SATOSHI" => Ok(Unit::Satoshi),
            "BTM" => Ok(Unit::Btm),
            "mBTM" => Ok(Unit::MilliBtm),
            "NEU" => Ok(Unit::Neu),
            _ => Err(SwapError::unit(format!(
                "Invalid '{}' unit, choose only 'BTC', 'mBTC', 'SATOSHI', 'BTM', 'mBTM' or 'NEU' units.",
                s
            ))),
        }
    }
}

fn unit_error(unit: &str, chain: Chain) -> SwapError {
    let choices = match chain {
        Chain::Bitcoin => "'BTC', 'mBTC' or 'SATOSHI'",
        Chain::Bytom | Chain::Vapor => "'BTM', 'mBTM' or 'NEU'",
    };
    SwapError::unit(format!(
        "Invalid {} '{}' unit, choose only {} units.",
        chain, unit, choices
    ))
}

/// Convert between units of the same family
///
/// `symbol` is "<FROM>2<TO>", for example "NEU2BTM" or "BTC2SATOSHI".
/// Conversions into a base unit drop the fractional base units.
pub fn amount_converter(amount: f64, symbol: &str) -> Result<f64> {
    let (from, to) = parse_symbol(symbol)?;
    let converted = amount * to.factor() / from.factor();
    if to.is_base() {
        Ok(truncate(converted))
    } else {
        Ok(converted)
    }
}

/// Whole part of `value`, ignoring floating point error next to an integer
fn truncate(value: f64) -> f64 {
    let nearest = value.round();
    if (value - nearest).abs() < FLOAT_TOLERANCE {
        nearest
    } else {
        value.trunc()
    }
}

const FLOAT_TOLERANCE: f64 = 1e-6;

fn parse_symbol(symbol: &str) -> Result<(Unit, Unit)> {
    let invalid = || {
        SwapError::symbol(
            format!("Invalid '{}' symbol/type", symbol),
            "choose only 'BTC2mBTC', 'BTC2SATOSHI', 'mBTC2BTC', 'mBTC2SATOSHI', 'SATOSHI2BTC', \
             'SATOSHI2mBTC', 'BTM2mBTM', 'BTM2NEU', 'mBTM2BTM', 'mBTM2NEU', 'NEU2BTM' or 'NEU2mBTM' symbols.",
        )
    };
    let (from, to) = symbol.split_once('2').ok_or_else(invalid)?;
    let from: Unit = from.parse().map_err(|_| invalid())?;
    let to: Unit = to.parse().map_err(|_| invalid())?;
    if from == to || from.is_bitcoin() != to.is_bitcoin() {
        return Err(invalid());
    }
    Ok((from, to))
}

/// Convert an amount in `unit` to base units
///
/// Fractions of a base unit are truncated.
pub fn to_base_units(amount: f64, unit: Unit) -> Result<u64> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(SwapError::unit(format!("Invalid '{}' amount.", amount)));
    }
    if unit.is_base() {
        return Ok(amount.trunc() as u64);
    }
    let base = if unit.is_bitcoin() {
        Unit::Satoshi
    } else {
        Unit::Neu
    };
    amount_converter(amount, &format!("{}2{}", unit, base)).map(|value| value as u64)
}

/// Convert base units to an amount in `unit`
pub fn from_base_units(base: u64, unit: Unit) -> f64 {
    base as f64 * unit.factor() / BASE_PER_COIN as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_converter() {
        assert_eq!(amount_converter(10_000_000.0, "NEU2BTM").unwrap(), 0.1);
        assert_eq!(amount_converter(0.1, "BTM2NEU").unwrap(), 10_000_000.0);
        assert_eq!(amount_converter(1.0, "mBTM2NEU").unwrap(), 100_000.0);
        assert_eq!(amount_converter(2.5, "BTM2mBTM").unwrap(), 2_500.0);
        assert_eq!(amount_converter(0.001, "BTC2SATOSHI").unwrap(), 100_000.0);
        assert_eq!(amount_converter(100_000.0, "SATOSHI2mBTC").unwrap(), 1.0);
    }

    #[test]
    fn test_base_conversion_truncates() {
        assert_eq!(amount_converter(0.123456789, "BTC2SATOSHI").unwrap(), 12_345_678.0);
        assert_eq!(to_base_units(0.123456789, Unit::Btm).unwrap(), 12_345_678);
        assert_eq!(to_base_units(1.999999999, Unit::Btc).unwrap(), 199_999_999);
        assert_eq!(amount_converter(0.000015, "mBTM2NEU").unwrap(), 1.0);

        // 0.29 * 1e8 is 28999999.999999996 in floating point
        assert_eq!(amount_converter(0.29, "BTM2NEU").unwrap(), 29_000_000.0);
        assert_eq!(to_base_units(0.29, Unit::Btc).unwrap(), 29_000_000);
    }

    #[test]
    fn test_invalid_symbols() {
        for symbol in ["NEU2NEU", "BTC2NEU", "BTM", "XYZ2BTM", ""] {
            let err = amount_converter(1.0, symbol).unwrap_err();
            assert_eq!(err.error_code(), "SYMBOL_ERROR", "{}", symbol);
        }
        let err = amount_converter(1.0, "NEU2BTC").unwrap_err();
        assert!(err.to_string().starts_with("Invalid 'NEU2BTC' symbol/type"));
    }

    #[test]
    fn test_to_base_units() {
        assert_eq!(to_base_units(10_000.9, Unit::Satoshi).unwrap(), 10_000);
        assert_eq!(to_base_units(0.1, Unit::Btm).unwrap(), 10_000_000);
        assert_eq!(to_base_units(3.0, Unit::MilliBtc).unwrap(), 300_000);
        assert!(to_base_units(-1.0, Unit::Neu).is_err());
    }

    #[test]
    fn test_units_per_chain() {
        assert_eq!(Unit::parse_for("NEU", Chain::Vapor).unwrap(), Unit::Neu);
        assert_eq!(Unit::parse_for("mBTC", Chain::Bitcoin).unwrap(), Unit::MilliBtc);
        assert!(Unit::parse_for("BTC", Chain::Bytom).is_err());
        assert!(Unit::parse_for("satoshi", Chain::Bitcoin).is_err());
        assert_eq!(Unit::base(Chain::Bytom), Unit::Neu);
        assert_eq!(from_base_units(10_000_000, Unit::Btm), 0.1);
    }
}
