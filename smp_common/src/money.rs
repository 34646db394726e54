use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const KES_CURRENCY_CODE: &str = "KES";
pub const KES_CURRENCY_CODE_LOWER: &str = "kes";

//--------------------------------------       Money        ----------------------------------------------------------
/// A monetary amount in Kenyan shilling cents. All arithmetic is integer arithmetic; amounts are only
/// rendered as decimal shillings for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, SubAssign, sub_assign, -);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a money amount: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {value} is too large to convert to Money")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Integer division truncates towards zero, so the sign must be emitted explicitly or
        // amounts between -1.00 and 0.00 would lose it.
        let sign = if self.0 < 0 { "-" } else { "" };
        let shillings = (self.0 / 100).abs();
        let cents = (self.0 % 100).abs();
        write!(f, "KSh {sign}{shillings}.{cents:02}")
    }
}

impl Money {
    /// Construct an amount from whole shillings.
    pub fn from_shillings(sh: i64) -> Self {
        Self(sh * 100)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn money_arithmetic() {
        let a = Money::from(1500);
        let b = Money::from(250);
        assert_eq!(a + b, Money::from(1750));
        assert_eq!(a - b, Money::from(1250));
        assert_eq!(-b, Money::from(-250));
        assert_eq!(b * 4, Money::from(1000));
        let mut c = a;
        c -= b;
        assert_eq!(c, Money::from(1250));
        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total, Money::from(2000));
    }

    #[test]
    fn money_display() {
        assert_eq!(Money::from(123_456).to_string(), "KSh 1234.56");
        assert_eq!(Money::from_shillings(80).to_string(), "KSh 80.00");
        assert_eq!(Money::from(5).to_string(), "KSh 0.05");
    }

    #[test]
    fn negative_money_displays_its_sign() {
        assert_eq!(Money::from(-50).to_string(), "KSh -0.50");
        assert_eq!(Money::from(-5).to_string(), "KSh -0.05");
        assert_eq!(Money::from(-123_456).to_string(), "KSh -1234.56");
        assert_eq!(Money::from_shillings(-80).to_string(), "KSh -80.00");
    }
}
