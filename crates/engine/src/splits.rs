//! Split calculator.
//!
//! Turns an expense amount and a [`SplitRequest`] into per-member shares whose
//! sum equals the amount exactly. Rounding leftovers (the equal-split
//! remainder, custom/percentage drift within tolerance) always land on the
//! payer's share, so the payer has to be one of the participants whenever
//! there is something left to assign.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{EngineError, MoneyCents, Percent, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitPolicy {
    Equal,
    Custom,
    Percentage,
}

impl SplitPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Custom => "custom",
            Self::Percentage => "percentage",
        }
    }
}

impl TryFrom<&str> for SplitPolicy {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "equal" => Ok(Self::Equal),
            "custom" => Ok(Self::Custom),
            "percentage" => Ok(Self::Percentage),
            other => Err(EngineError::InvalidSplit(format!(
                "invalid split policy: {other}"
            ))),
        }
    }
}

/// Explicit amount owed by one participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareAmount {
    pub member_id: String,
    pub amount: MoneyCents,
}

/// Percentage of the expense owed by one participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharePercent {
    pub member_id: String,
    pub percent: Percent,
}

/// How an expense is divided, together with the ordered participant list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SplitRequest {
    Equal { participants: Vec<String> },
    Custom { shares: Vec<ShareAmount> },
    Percentage { shares: Vec<SharePercent> },
}

impl SplitRequest {
    pub fn equal<I, S>(participants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Equal {
            participants: participants.into_iter().map(Into::into).collect(),
        }
    }

    pub fn custom<I, S>(shares: I) -> Self
    where
        I: IntoIterator<Item = (S, MoneyCents)>,
        S: Into<String>,
    {
        Self::Custom {
            shares: shares
                .into_iter()
                .map(|(member_id, amount)| ShareAmount {
                    member_id: member_id.into(),
                    amount,
                })
                .collect(),
        }
    }

    pub fn percentage<I, S>(shares: I) -> Self
    where
        I: IntoIterator<Item = (S, Percent)>,
        S: Into<String>,
    {
        Self::Percentage {
            shares: shares
                .into_iter()
                .map(|(member_id, percent)| SharePercent {
                    member_id: member_id.into(),
                    percent,
                })
                .collect(),
        }
    }

    pub fn policy(&self) -> SplitPolicy {
        match self {
            Self::Equal { .. } => SplitPolicy::Equal,
            Self::Custom { .. } => SplitPolicy::Custom,
            Self::Percentage { .. } => SplitPolicy::Percentage,
        }
    }

    /// Participant ids in request order.
    pub fn member_ids(&self) -> Vec<&str> {
        match self {
            Self::Equal { participants } => participants.iter().map(String::as_str).collect(),
            Self::Custom { shares } => shares.iter().map(|s| s.member_id.as_str()).collect(),
            Self::Percentage { shares } => shares.iter().map(|s| s.member_id.as_str()).collect(),
        }
    }
}

/// One computed `(participant, amount)` pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitShare {
    pub member_id: String,
    pub amount: MoneyCents,
}

/// Computes the shares of `total` according to `request`.
///
/// The result preserves the participant order of the request and sums to
/// `total` exactly. Nothing is persisted here, so a failure leaves no state
/// behind.
pub fn compute_splits(
    total: MoneyCents,
    payer_id: &str,
    request: &SplitRequest,
) -> ResultEngine<Vec<SplitShare>> {
    if !total.is_positive() {
        return Err(EngineError::InvalidAmount("amount must be > 0".to_string()));
    }
    validate_participants(&request.member_ids())?;

    let mut shares = match request {
        SplitRequest::Equal { participants } => equal_shares(total, participants),
        SplitRequest::Custom { shares } => custom_shares(total, shares)?,
        SplitRequest::Percentage { shares } => percentage_shares(total, shares)?,
    };

    let computed = checked_total(shares.iter().map(|s| s.amount))?;
    assign_to_payer(&mut shares, payer_id, total - computed)?;

    let reconciled = checked_total(shares.iter().map(|s| s.amount))?;
    if !reconciled.within_tolerance(total) {
        return Err(EngineError::InvalidSplit(format!(
            "split amounts ({reconciled}) do not reconcile with the total amount ({total})"
        )));
    }
    Ok(shares)
}

/// Sums amounts, failing instead of wrapping on overflow.
pub(crate) fn checked_total<I>(amounts: I) -> ResultEngine<MoneyCents>
where
    I: IntoIterator<Item = MoneyCents>,
{
    amounts
        .into_iter()
        .try_fold(MoneyCents::ZERO, MoneyCents::checked_add)
        .ok_or_else(|| EngineError::InvalidSplit("split amounts are out of range".to_string()))
}

fn validate_participants(member_ids: &[&str]) -> ResultEngine<()> {
    if member_ids.is_empty() {
        return Err(EngineError::InvalidSplit(
            "at least one split is required".to_string(),
        ));
    }
    let mut seen = HashSet::with_capacity(member_ids.len());
    for id in member_ids {
        if id.trim().is_empty() {
            return Err(EngineError::InvalidSplit(
                "participant id must not be empty".to_string(),
            ));
        }
        if !seen.insert(*id) {
            return Err(EngineError::InvalidSplit(format!(
                "participant {id} appears more than once"
            )));
        }
    }
    Ok(())
}

fn equal_shares(total: MoneyCents, participants: &[String]) -> Vec<SplitShare> {
    // `participants` is non-empty and `total` positive: plain integer division floors.
    let count = participants.len() as i64;
    let per_person = MoneyCents::new(total.cents() / count);
    participants
        .iter()
        .map(|member_id| SplitShare {
            member_id: member_id.clone(),
            amount: per_person,
        })
        .collect()
}

fn custom_shares(total: MoneyCents, shares: &[ShareAmount]) -> ResultEngine<Vec<SplitShare>> {
    if let Some(negative) = shares.iter().find(|s| s.amount.is_negative()) {
        return Err(EngineError::InvalidSplit(format!(
            "split amount for {} cannot be negative",
            negative.member_id
        )));
    }
    if let Some(oversized) = shares.iter().find(|s| s.amount > total) {
        return Err(EngineError::InvalidSplit(format!(
            "split amount for {} exceeds the total amount ({total})",
            oversized.member_id
        )));
    }
    let sum = checked_total(shares.iter().map(|s| s.amount))?;
    if !sum.within_tolerance(total) {
        return Err(EngineError::InvalidSplit(format!(
            "custom split amounts ({sum}) must equal the total amount ({total})"
        )));
    }
    Ok(shares
        .iter()
        .map(|s| SplitShare {
            member_id: s.member_id.clone(),
            amount: s.amount,
        })
        .collect())
}

fn percentage_shares(
    total: MoneyCents,
    shares: &[SharePercent],
) -> ResultEngine<Vec<SplitShare>> {
    if let Some(negative) = shares.iter().find(|s| s.percent < Percent::ZERO) {
        return Err(EngineError::InvalidSplit(format!(
            "percentage for {} cannot be negative",
            negative.member_id
        )));
    }
    let ceiling = Percent::HUNDRED.hundredths() + 1;
    if let Some(oversized) = shares.iter().find(|s| s.percent.hundredths() > ceiling) {
        return Err(EngineError::InvalidSplit(format!(
            "percentage for {} exceeds 100",
            oversized.member_id
        )));
    }
    let sum = shares
        .iter()
        .try_fold(0_i64, |acc, s| acc.checked_add(s.percent.hundredths()))
        .ok_or_else(|| EngineError::InvalidSplit("percentages are out of range".to_string()))?;
    if (sum - Percent::HUNDRED.hundredths()).abs() > 1 {
        return Err(EngineError::InvalidSplit(format!(
            "percentages must sum to 100 (got {})",
            Percent::new(sum)
        )));
    }
    Ok(shares
        .iter()
        .map(|s| SplitShare {
            member_id: s.member_id.clone(),
            amount: s.percent.share_of(total),
        })
        .collect())
}

fn assign_to_payer(
    shares: &mut [SplitShare],
    payer_id: &str,
    leftover: MoneyCents,
) -> ResultEngine<()> {
    if leftover.is_zero() {
        return Ok(());
    }
    let payer = shares
        .iter_mut()
        .find(|s| s.member_id == payer_id)
        .ok_or_else(|| {
            EngineError::InvalidSplit(format!(
                "payer must be a participant to absorb the rounding difference of {leftover}"
            ))
        })?;
    payer.amount += leftover;
    if payer.amount.is_negative() {
        return Err(EngineError::InvalidSplit(format!(
            "split amount for {payer_id} cannot be negative"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(value: i64) -> MoneyCents {
        MoneyCents::new(value)
    }

    fn amounts(shares: &[SplitShare]) -> Vec<(&str, i64)> {
        shares
            .iter()
            .map(|s| (s.member_id.as_str(), s.amount.cents()))
            .collect()
    }

    #[test]
    fn equal_split_gives_remainder_to_payer() {
        let shares =
            compute_splits(cents(100_00), "a", &SplitRequest::equal(["a", "b", "c"])).unwrap();
        assert_eq!(amounts(&shares), vec![("a", 3334), ("b", 3333), ("c", 3333)]);
    }

    #[test]
    fn equal_split_remainder_follows_payer_not_position() {
        let shares =
            compute_splits(cents(100_00), "c", &SplitRequest::equal(["a", "b", "c"])).unwrap();
        assert_eq!(amounts(&shares), vec![("a", 3333), ("b", 3333), ("c", 3334)]);
    }

    #[test]
    fn equal_split_without_remainder_allows_absent_payer() {
        let shares = compute_splits(cents(90_00), "z", &SplitRequest::equal(["a", "b"])).unwrap();
        assert_eq!(amounts(&shares), vec![("a", 4500), ("b", 4500)]);
    }

    #[test]
    fn remainder_without_payer_among_participants_is_rejected() {
        let err = compute_splits(cents(100_00), "z", &SplitRequest::equal(["a", "b", "c"]))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidSplit(_)));
    }

    #[test]
    fn percentage_split_example() {
        let request = SplitRequest::percentage([("a", Percent::new(6000)), ("b", Percent::new(4000))]);
        let shares = compute_splits(cents(90_00), "a", &request).unwrap();
        assert_eq!(amounts(&shares), vec![("a", 5400), ("b", 3600)]);
    }

    #[test]
    fn percentage_drift_goes_to_payer() {
        // 3 x 33.33% (+ 0.01% on the payer) of 10.00 -> 3.33 each, 0.01 drift.
        let request = SplitRequest::percentage([
            ("a", Percent::new(3334)),
            ("b", Percent::new(3333)),
            ("c", Percent::new(3333)),
        ]);
        let shares = compute_splits(cents(10_00), "b", &request).unwrap();
        assert_eq!(amounts(&shares), vec![("a", 333), ("b", 334), ("c", 333)]);
    }

    #[test]
    fn percentage_sum_must_be_hundred() {
        let request = SplitRequest::percentage([("a", Percent::new(5000)), ("b", Percent::new(4000))]);
        let err = compute_splits(cents(90_00), "a", &request).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSplit(_)));
    }

    #[test]
    fn custom_split_rejects_mismatched_sum() {
        let request = SplitRequest::custom([("a", cents(20_00)), ("b", cents(20_00))]);
        let err = compute_splits(cents(50_00), "a", &request).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSplit(_)));
    }

    #[test]
    fn custom_split_rejects_negative_share() {
        let request = SplitRequest::custom([("a", cents(60_00)), ("b", cents(-10_00))]);
        let err = compute_splits(cents(50_00), "a", &request).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSplit(_)));
    }

    #[test]
    fn custom_split_one_cent_off_is_reconciled_on_payer() {
        let request = SplitRequest::custom([("a", cents(24_99)), ("b", cents(25_00))]);
        let shares = compute_splits(cents(50_00), "a", &request).unwrap();
        assert_eq!(amounts(&shares), vec![("a", 2500), ("b", 2500)]);
    }

    #[test]
    fn oversized_custom_shares_are_rejected_without_overflow() {
        let request = SplitRequest::custom([
            ("a", cents(i64::MAX)),
            ("b", cents(i64::MAX)),
            ("c", cents(50_02)),
        ]);
        let err = compute_splits(cents(50_00), "a", &request).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSplit(_)));
    }

    #[test]
    fn oversized_percentages_are_rejected_without_overflow() {
        let request = SplitRequest::percentage([
            ("a", Percent::new(i64::MAX)),
            ("b", Percent::new(i64::MAX)),
            ("c", Percent::new(2)),
        ]);
        let err = compute_splits(cents(50_00), "a", &request).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSplit(_)));

        let request = SplitRequest::percentage([("a", Percent::new(150_00)), ("b", Percent::new(-50_00))]);
        assert!(compute_splits(cents(50_00), "a", &request).is_err());
    }

    #[test]
    fn checked_total_reports_overflow() {
        let err = checked_total([cents(i64::MAX), cents(1)]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSplit(_)));
        assert_eq!(checked_total([cents(2), cents(3)]).unwrap(), cents(5));
    }

    #[test]
    fn empty_and_duplicate_participants_are_rejected() {
        let empty = SplitRequest::Equal {
            participants: Vec::new(),
        };
        assert!(compute_splits(cents(10_00), "a", &empty).is_err());
        let duplicate = SplitRequest::equal(["a", "a"]);
        assert!(compute_splits(cents(10_00), "a", &duplicate).is_err());
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let err = compute_splits(cents(0), "a", &SplitRequest::equal(["a"])).unwrap_err();
        assert_eq!(err, EngineError::InvalidAmount("amount must be > 0".to_string()));
    }

    #[test]
    fn every_policy_sums_exactly() {
        let total = cents(1_234_57);
        let requests = [
            SplitRequest::equal(["a", "b", "c", "d", "e", "f", "g"]),
            SplitRequest::custom([("a", cents(1_000_00)), ("b", cents(234_56))]),
            SplitRequest::percentage([
                ("a", Percent::new(1429)),
                ("b", Percent::new(1429)),
                ("c", Percent::new(7142)),
            ]),
        ];
        for request in &requests {
            let shares = compute_splits(total, "a", request).unwrap();
            let sum: MoneyCents = shares.iter().map(|s| s.amount).sum();
            assert_eq!(sum, total, "{:?}", request.policy());
        }
    }
}
