//! Currency units
//!
//! Amounts arrive as exact decimals tagged with a unit. Native units have
//! fixed precision; fiat units go through an [`ExchangeRates`] collaborator.
//! Unknown unit codes are an error, never a silent default.

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::{Result, WalletError};

pub const SATOSHI_PER_BTC: u64 = 100_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fiat {
    Usd,
    Eur,
    Gbp,
    Jpy,
    Cny,
    Cad,
    Aud,
    Chf,
}

impl Fiat {
    pub fn code(&self) -> &'static str {
        match self {
            Fiat::Usd => "usd",
            Fiat::Eur => "eur",
            Fiat::Gbp => "gbp",
            Fiat::Jpy => "jpy",
            Fiat::Cny => "cny",
            Fiat::Cad => "cad",
            Fiat::Aud => "aud",
            Fiat::Chf => "chf",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Satoshi,
    Ubtc,
    Mbtc,
    Btc,
    Fiat(Fiat),
}

impl Unit {
    /// Satoshi per one whole unit, for the fixed-precision units.
    pub fn satoshi_multiplier(&self) -> Option<u64> {
        match self {
            Unit::Satoshi => Some(1),
            Unit::Ubtc => Some(100),
            Unit::Mbtc => Some(100_000),
            Unit::Btc => Some(SATOSHI_PER_BTC),
            Unit::Fiat(_) => None,
        }
    }
}

impl FromStr for Unit {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self> {
        let unit = match s.trim().to_ascii_lowercase().as_str() {
            "sat" | "sats" | "satoshi" | "satoshis" => Unit::Satoshi,
            "ubtc" | "bits" => Unit::Ubtc,
            "mbtc" => Unit::Mbtc,
            "btc" => Unit::Btc,
            "usd" => Unit::Fiat(Fiat::Usd),
            "eur" => Unit::Fiat(Fiat::Eur),
            "gbp" => Unit::Fiat(Fiat::Gbp),
            "jpy" => Unit::Fiat(Fiat::Jpy),
            "cny" => Unit::Fiat(Fiat::Cny),
            "cad" => Unit::Fiat(Fiat::Cad),
            "aud" => Unit::Fiat(Fiat::Aud),
            "chf" => Unit::Fiat(Fiat::Chf),
            _ => return Err(WalletError::UnknownUnit(s.to_string())),
        };
        Ok(unit)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Satoshi => f.write_str("satoshi"),
            Unit::Ubtc => f.write_str("ubtc"),
            Unit::Mbtc => f.write_str("mbtc"),
            Unit::Btc => f.write_str("btc"),
            Unit::Fiat(fiat) => f.write_str(fiat.code()),
        }
    }
}

/// Currency-conversion collaborator for fiat units.
pub trait ExchangeRates: Send + Sync {
    /// How many satoshi one whole unit of `fiat` buys right now.
    fn satoshi_per_unit(&self, fiat: Fiat) -> Result<Decimal>;
}

/// Convert `amount` of `unit` into whole satoshi.
///
/// Native units must land on a whole satoshi; fiat conversions are
/// truncated toward zero.
pub fn to_satoshi(amount: Decimal, unit: Unit, rates: Option<&dyn ExchangeRates>) -> Result<u64> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(WalletError::InvalidAmount(format!("{} {} is negative", amount, unit)));
    }

    let satoshi = match (unit, unit.satoshi_multiplier()) {
        (_, Some(multiplier)) => {
            let value = amount
                .checked_mul(Decimal::from(multiplier))
                .ok_or_else(|| WalletError::InvalidAmount(format!("{} {} overflows", amount, unit)))?;
            if !value.fract().is_zero() {
                return Err(WalletError::InvalidAmount(format!(
                    "{} {} is not a whole number of satoshi",
                    amount, unit
                )));
            }
            value
        }
        (Unit::Fiat(fiat), None) => {
            let rate = fiat_rate(fiat, rates)?;
            amount
                .checked_mul(rate)
                .ok_or_else(|| WalletError::InvalidAmount(format!("{} {} overflows", amount, unit)))?
                .trunc()
        }
        (other, None) => return Err(WalletError::UnknownUnit(other.to_string())),
    };

    satoshi
        .to_u64()
        .ok_or_else(|| WalletError::InvalidAmount(format!("{} {} is out of range", amount, unit)))
}

/// Express a satoshi amount in `unit`, for display.
pub fn satoshi_to(amount: u64, unit: Unit, rates: Option<&dyn ExchangeRates>) -> Result<Decimal> {
    let amount = Decimal::from(amount);
    match (unit, unit.satoshi_multiplier()) {
        (_, Some(multiplier)) => Ok(amount / Decimal::from(multiplier)),
        (Unit::Fiat(fiat), None) => {
            let rate = fiat_rate(fiat, rates)?;
            if rate.is_zero() {
                return Err(WalletError::Service(format!("Zero exchange rate for {}", unit)));
            }
            Ok(amount / rate)
        }
        (other, None) => Err(WalletError::UnknownUnit(other.to_string())),
    }
}

fn fiat_rate(fiat: Fiat, rates: Option<&dyn ExchangeRates>) -> Result<Decimal> {
    let rates = rates.ok_or_else(|| {
        WalletError::Service(format!("No exchange rate source configured for {}", fiat.code()))
    })?;
    rates.satoshi_per_unit(fiat)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRates(Decimal);

    impl ExchangeRates for FixedRates {
        fn satoshi_per_unit(&self, _fiat: Fiat) -> Result<Decimal> {
            Ok(self.0)
        }
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn parses_unit_codes_case_insensitively() {
        assert_eq!("BTC".parse::<Unit>().unwrap(), Unit::Btc);
        assert_eq!("satoshi".parse::<Unit>().unwrap(), Unit::Satoshi);
        assert_eq!("Usd".parse::<Unit>().unwrap(), Unit::Fiat(Fiat::Usd));
    }

    #[test]
    fn unknown_unit_is_an_error() {
        let err = "doge".parse::<Unit>().unwrap_err();
        assert!(matches!(err, WalletError::UnknownUnit(code) if code == "doge"));
    }

    #[test]
    fn native_units_convert_exactly() {
        assert_eq!(to_satoshi(dec("0.0005"), Unit::Btc, None).unwrap(), 50_000);
        assert_eq!(to_satoshi(dec("1.5"), Unit::Mbtc, None).unwrap(), 150_000);
        assert_eq!(to_satoshi(dec("3"), Unit::Ubtc, None).unwrap(), 300);
        assert_eq!(to_satoshi(dec("546"), Unit::Satoshi, None).unwrap(), 546);
    }

    #[test]
    fn fractional_satoshi_is_rejected() {
        let err = to_satoshi(dec("0.000000001"), Unit::Btc, None).unwrap_err();
        assert!(matches!(err, WalletError::InvalidAmount(_)));
    }

    #[test]
    fn negative_amount_is_rejected() {
        assert!(to_satoshi(dec("-1"), Unit::Satoshi, None).is_err());
    }

    #[test]
    fn fiat_requires_rates_and_truncates() {
        assert!(matches!(
            to_satoshi(dec("1"), Unit::Fiat(Fiat::Usd), None),
            Err(WalletError::Service(_))
        ));
        let rates = FixedRates(dec("1666.66"));
        assert_eq!(
            to_satoshi(dec("1.5"), Unit::Fiat(Fiat::Usd), Some(&rates)).unwrap(),
            2499
        );
    }

    #[test]
    fn satoshi_to_display_units() {
        assert_eq!(satoshi_to(150_000, Unit::Mbtc, None).unwrap(), dec("1.5"));
        let rates = FixedRates(dec("2000"));
        assert_eq!(
            satoshi_to(5000, Unit::Fiat(Fiat::Eur), Some(&rates)).unwrap(),
            dec("2.5")
        );
    }
}
