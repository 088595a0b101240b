use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const CURRENCY_CODE: &str = "CR";
pub const CURRENCY_CODE_LOWER: &str = "cr";

const CENTS_PER_CREDIT: i64 = 100;

//--------------------------------------       Credits       ---------------------------------------------------------

/// The internal store-credit currency, held as an integer number of hundredths of a credit.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Credits(i64);

op!(Credits: Add::add);
op!(Credits: Sub::sub);
op!(Credits: mut AddAssign::add_assign);
op!(Credits: mut SubAssign::sub_assign);
op!(Credits: neg);

impl Mul<i64> for Credits {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Credits {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in credits: {0}")]
pub struct CreditsConversionError(String);

impl From<i64> for Credits {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Credits {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Credits {}

impl TryFrom<u64> for Credits {
    type Error = CreditsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(CreditsConversionError(format!("Value {} is too large to convert to Credits", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Credits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}{}", cents / 100, cents % 100, CURRENCY_CODE_LOWER)
    }
}

impl Credits {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_credits(credits: i64) -> Self {
        Self(credits * CENTS_PER_CREDIT)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Credits::from_credits(100);
        let b = Credits::from(2_550);
        assert_eq!(a + b, Credits::from(12_550));
        assert_eq!(a - b, Credits::from(7_450));
        assert_eq!(-b, Credits::from(-2_550));
        assert_eq!(b * 4, Credits::from_credits(102));
        let total: Credits = vec![a, b, b].into_iter().sum();
        assert_eq!(total, Credits::from(15_100));
    }

    #[test]
    fn display() {
        assert_eq!(Credits::from_credits(60).to_string(), "60.00cr");
        assert_eq!(Credits::from(1_05).to_string(), "1.05cr");
        assert_eq!(Credits::from(-9_99).to_string(), "-9.99cr");
        assert_eq!(Credits::default().to_string(), "0.00cr");
    }

    #[test]
    fn sign_checks() {
        assert!(Credits::from(1).is_positive());
        assert!(!Credits::default().is_positive());
        assert!(!Credits::from(-1).is_positive());
    }
}
