//! Stake amounts
//!
//! Stakes are entered as decimal strings ("0.05") and travel to the ledger
//! as integer base units. `StakeAmount` holds an exact fixed-point value with
//! 18 fractional digits so that parsing and minimum checks never go through
//! floating point. Digits past the 18th are truncated.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AmountError;

/// Fractional digits kept by `StakeAmount`
pub const STAKE_DECIMALS: u32 = 18;

const ATTO_PER_UNIT: u128 = 10u128.pow(STAKE_DECIMALS);

/// Exact non-negative decimal stake
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StakeAmount {
    atto: u128,
}

impl StakeAmount {
    pub const ZERO: StakeAmount = StakeAmount { atto: 0 };

    /// Create from 10^-18 units
    pub const fn from_atto(atto: u128) -> Self {
        Self { atto }
    }

    /// Value in 10^-18 units
    pub fn atto(&self) -> u128 {
        self.atto
    }

    pub fn is_zero(&self) -> bool {
        self.atto == 0
    }

    /// Convert to ledger base units, rounding down.
    ///
    /// `scale` is the number of base units per whole unit.
    pub fn to_base_units(&self, scale: u64) -> Result<u64, AmountError> {
        if scale == 0 {
            return Err(AmountError::InvalidScale(scale));
        }
        let scaled = self
            .atto
            .checked_mul(u128::from(scale))
            .ok_or(AmountError::Overflow)?
            / ATTO_PER_UNIT;
        u64::try_from(scaled).map_err(|_| AmountError::Overflow)
    }

    /// Convert from ledger base units
    pub fn from_base_units(units: u64, scale: u64) -> Result<Self, AmountError> {
        if scale == 0 {
            return Err(AmountError::InvalidScale(scale));
        }
        let atto = u128::from(units)
            .checked_mul(ATTO_PER_UNIT)
            .ok_or(AmountError::Overflow)?
            / u128::from(scale);
        Ok(Self { atto })
    }
}

impl FromStr for StakeAmount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountError::Empty);
        }
        let unsigned = match s.as_bytes()[0] {
            b'-' => {
                let rest = &s[1..];
                return match rest.parse::<StakeAmount>() {
                    Ok(v) if v.is_zero() => Ok(v),
                    Ok(_) | Err(AmountError::BelowResolution) => Err(AmountError::Negative),
                    Err(e) => Err(e),
                };
            }
            b'+' => &s[1..],
            _ => s,
        };

        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((i, f)) => (i, f),
            None => (unsigned, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(AmountError::Malformed(s.to_string()));
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(AmountError::Malformed(s.to_string()));
        }

        let mut atto: u128 = 0;
        for digit in int_part.bytes() {
            atto = atto
                .checked_mul(10)
                .and_then(|v| v.checked_add(u128::from(digit - b'0')))
                .ok_or(AmountError::Overflow)?;
        }
        atto = atto.checked_mul(ATTO_PER_UNIT).ok_or(AmountError::Overflow)?;

        let kept = frac_part.len().min(STAKE_DECIMALS as usize);
        let mut frac: u128 = 0;
        for digit in frac_part[..kept].bytes() {
            frac = frac * 10 + u128::from(digit - b'0');
        }
        frac *= 10u128.pow(STAKE_DECIMALS - kept as u32);
        atto = atto.checked_add(frac).ok_or(AmountError::Overflow)?;

        let truncated_nonzero = frac_part[kept..].bytes().any(|b| b != b'0');
        if atto == 0 && truncated_nonzero {
            return Err(AmountError::BelowResolution);
        }

        Ok(Self { atto })
    }
}

impl TryFrom<String> for StakeAmount {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StakeAmount> for String {
    fn from(amount: StakeAmount) -> Self {
        amount.to_string()
    }
}

impl fmt::Display for StakeAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.atto / ATTO_PER_UNIT;
        let frac = self.atto % ATTO_PER_UNIT;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{:0width$}", frac, width = STAKE_DECIMALS as usize);
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl fmt::Debug for StakeAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StakeAmount({self})")
    }
}
