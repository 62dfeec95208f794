use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Signed money amount represented as **integer cents**.
///
/// Use this type for **all** monetary values in the engine (expense amounts,
/// split shares, balances, settlements) to avoid floating-point drift.
///
/// The value is signed:
/// - positive = paid / owed to the member
/// - negative = owed / reversed
///
/// # Examples
///
/// ```rust
/// use engine::MoneyCents;
///
/// let amount = MoneyCents::new(12_34);
/// assert_eq!(amount.cents(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
///
/// Parsing from user input (accepts `.` or `,` as decimal separator; rejects >
/// 2 decimals):
///
/// ```rust
/// use engine::MoneyCents;
///
/// assert_eq!("10".parse::<MoneyCents>().unwrap().cents(), 1000);
/// assert_eq!("10,5".parse::<MoneyCents>().unwrap().cents(), 1050);
/// assert!("12.345".parse::<MoneyCents>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct MoneyCents(i64);

/// Largest difference (one cent) tolerated when reconciling sums of shares.
pub const TOLERANCE: MoneyCents = MoneyCents(1);

impl MoneyCents {
    pub const ZERO: MoneyCents = MoneyCents(0);

    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns `true` if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_add(rhs.0).map(MoneyCents)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_sub(rhs.0).map(MoneyCents)
    }

    /// `true` when `self` and `other` differ by at most [`TOLERANCE`].
    #[must_use]
    pub fn within_tolerance(self, other: MoneyCents) -> bool {
        self.0
            .checked_sub(other.0)
            .is_some_and(|diff| diff.unsigned_abs() <= TOLERANCE.0.unsigned_abs())
    }
}

impl fmt::Display for MoneyCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fixed2(f, self.0)
    }
}

impl From<i64> for MoneyCents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<MoneyCents> for i64 {
    fn from(value: MoneyCents) -> Self {
        value.0
    }
}

impl Add for MoneyCents {
    type Output = MoneyCents;

    fn add(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 + rhs.0)
    }
}

impl AddAssign for MoneyCents {
    fn add_assign(&mut self, rhs: MoneyCents) {
        self.0 += rhs.0;
    }
}

impl Sub for MoneyCents {
    type Output = MoneyCents;

    fn sub(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 - rhs.0)
    }
}

impl SubAssign for MoneyCents {
    fn sub_assign(&mut self, rhs: MoneyCents) {
        self.0 -= rhs.0;
    }
}

impl Neg for MoneyCents {
    type Output = MoneyCents;

    fn neg(self) -> Self::Output {
        MoneyCents(-self.0)
    }
}

impl Sum for MoneyCents {
    fn sum<I: Iterator<Item = MoneyCents>>(iter: I) -> Self {
        iter.fold(MoneyCents::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a MoneyCents> for MoneyCents {
    fn sum<I: Iterator<Item = &'a MoneyCents>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl FromStr for MoneyCents {
    type Err = EngineError;

    /// Parses a decimal string into cents.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
    ///
    /// Validation rules:
    /// - max 2 fractional digits (rejects `12.345`)
    /// - rejects empty/invalid strings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed2(s).map(MoneyCents)
    }
}

/// A percentage expressed in **hundredths of a percent**.
///
/// `Percent::new(60_00)` is 60%, `Percent::new(33_33)` is 33.33%. Parsing
/// follows the same rules as [`MoneyCents`], but negative values are rejected.
///
/// ```rust
/// use engine::Percent;
///
/// assert_eq!("33.33".parse::<Percent>().unwrap().hundredths(), 3333);
/// assert_eq!(Percent::new(6000).to_string(), "60.00%");
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Percent(i64);

impl Percent {
    pub const ZERO: Percent = Percent(0);
    pub const HUNDRED: Percent = Percent(100_00);

    #[must_use]
    pub const fn new(hundredths: i64) -> Self {
        Self(hundredths)
    }

    #[must_use]
    pub const fn hundredths(self) -> i64 {
        self.0
    }

    /// Share of `amount` for this percentage, rounded half away from zero to
    /// the nearest cent.
    #[must_use]
    pub fn share_of(self, amount: MoneyCents) -> MoneyCents {
        let product = i128::from(amount.cents()) * i128::from(self.0);
        let divisor = i128::from(Self::HUNDRED.0) * 100;
        let half = divisor / 2;
        let rounded = if product >= 0 {
            (product + half) / divisor
        } else {
            (product - half) / divisor
        };
        // |amount * pct / 10_000| never exceeds |amount| for pct <= 100%.
        MoneyCents(i64::try_from(rounded).unwrap_or(i64::MAX))
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fixed2(f, self.0)?;
        f.write_str("%")
    }
}

impl FromStr for Percent {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().trim_end_matches('%');
        let value = parse_fixed2(raw)?;
        if value < 0 {
            return Err(EngineError::InvalidAmount(
                "percentage must not be negative".to_string(),
            ));
        }
        Ok(Percent(value))
    }
}

fn write_fixed2(f: &mut fmt::Formatter<'_>, value: i64) -> fmt::Result {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    let units = abs / 100;
    let fraction = abs % 100;
    write!(f, "{sign}{units}.{fraction:02}")
}

/// Parses a decimal with at most two fractional digits into hundredths.
fn parse_fixed2(s: &str) -> Result<i64, EngineError> {
    let empty = || EngineError::InvalidAmount("empty amount".to_string());
    let invalid = || EngineError::InvalidAmount("invalid amount".to_string());
    let overflow = || EngineError::InvalidAmount("amount too large".to_string());

    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(empty());
    }

    let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
        (true, stripped)
    } else if let Some(stripped) = trimmed.strip_prefix('+') {
        (false, stripped)
    } else {
        (false, trimmed)
    };

    let rest = rest.trim();
    if rest.is_empty() {
        return Err(empty());
    }

    let rest = rest.replace(',', ".");
    let mut parts = rest.split('.');
    let units_str = parts.next().ok_or_else(invalid)?;
    let fraction_str = parts.next();

    if parts.next().is_some() {
        return Err(invalid());
    }

    if units_str.is_empty() || !units_str.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let units: i64 = units_str.parse().map_err(|_| overflow())?;

    let fraction: i64 = match fraction_str {
        None | Some("") => 0,
        Some(frac) => {
            if !frac.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            match frac.len() {
                1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
                2 => frac.parse::<i64>().map_err(|_| invalid())?,
                _ => return Err(EngineError::InvalidAmount("too many decimals".to_string())),
            }
        }
    };

    let total = units
        .checked_mul(100)
        .and_then(|v| v.checked_add(fraction))
        .ok_or_else(overflow)?;

    if negative {
        total.checked_neg().ok_or_else(overflow)
    } else {
        Ok(total)
    }
}
