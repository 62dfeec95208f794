//! Greedy debt netting.
//!
//! Creditors and debtors are each sorted by magnitude (largest first) and
//! matched with two pointers, transferring the smaller of the two open
//! amounts each step. Every step closes at least one side, so the plan never
//! has more than `n - 1` transfers for `n` non-zero balances. It is not
//! guaranteed to be the minimum number of transfers: that problem is
//! NP-hard, and the greedy plan is the accepted trade-off.

use serde::{Deserialize, Serialize};

use crate::{MemberBalance, MoneyCents};

/// Balances whose magnitude does not exceed this are treated as settled.
pub const SETTLED_THRESHOLD: MoneyCents = MoneyCents::new(1);

/// A suggested payment from a debtor to a creditor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedTransfer {
    pub from: String,
    pub from_name: String,
    pub to: String,
    pub to_name: String,
    pub amount: MoneyCents,
}

struct Open<'a> {
    member: &'a MemberBalance,
    remaining: MoneyCents,
}

/// Computes transfers that bring every balance back to zero.
pub fn suggest_transfers(balances: &[MemberBalance]) -> Vec<SuggestedTransfer> {
    let mut creditors: Vec<Open<'_>> = Vec::new();
    let mut debtors: Vec<Open<'_>> = Vec::new();
    for member in balances {
        if member.net_balance > SETTLED_THRESHOLD {
            creditors.push(Open {
                member,
                remaining: member.net_balance,
            });
        } else if member.net_balance < -SETTLED_THRESHOLD {
            debtors.push(Open {
                member,
                remaining: member.net_balance.abs(),
            });
        }
    }

    let by_magnitude = |a: &Open<'_>, b: &Open<'_>| {
        b.remaining
            .cmp(&a.remaining)
            .then_with(|| a.member.member_id.cmp(&b.member.member_id))
    };
    creditors.sort_by(by_magnitude);
    debtors.sort_by(by_magnitude);

    let mut transfers = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < creditors.len() && j < debtors.len() {
        let amount = creditors[i].remaining.min(debtors[j].remaining);
        if amount.is_positive() {
            transfers.push(SuggestedTransfer {
                from: debtors[j].member.member_id.clone(),
                from_name: debtors[j].member.name.clone(),
                to: creditors[i].member.member_id.clone(),
                to_name: creditors[i].member.name.clone(),
                amount,
            });
        }

        creditors[i].remaining -= amount;
        debtors[j].remaining -= amount;

        // Advance once less than a cent is left open.
        if !creditors[i].remaining.is_positive() {
            i += 1;
        }
        if !debtors[j].remaining.is_positive() {
            j += 1;
        }
    }

    transfers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balances(entries: &[(&str, i64)]) -> Vec<MemberBalance> {
        entries
            .iter()
            .map(|(id, cents)| MemberBalance {
                member_id: id.to_string(),
                name: id.to_uppercase(),
                net_balance: MoneyCents::new(*cents),
            })
            .collect()
    }

    fn plan(transfers: &[SuggestedTransfer]) -> Vec<(&str, &str, i64)> {
        transfers
            .iter()
            .map(|t| (t.from.as_str(), t.to.as_str(), t.amount.cents()))
            .collect()
    }

    #[test]
    fn single_debtor_covers_both_creditors() {
        let transfers = suggest_transfers(&balances(&[("a", 50_00), ("b", 30_00), ("c", -80_00)]));
        assert_eq!(plan(&transfers), vec![("c", "a", 5000), ("c", "b", 3000)]);
        let total: MoneyCents = transfers.iter().map(|t| t.amount).sum();
        assert_eq!(total.cents(), 80_00);
        assert!(transfers.iter().all(|t| t.amount.is_positive()));
        assert_eq!(transfers[0].from_name, "C");
    }

    #[test]
    fn settled_group_needs_no_transfers() {
        assert!(suggest_transfers(&balances(&[("a", 0), ("b", 0)])).is_empty());
        assert!(suggest_transfers(&[]).is_empty());
    }

    #[test]
    fn one_cent_balances_count_as_settled() {
        assert!(suggest_transfers(&balances(&[("a", 1), ("b", -1)])).is_empty());

        let transfers = suggest_transfers(&balances(&[("a", 2), ("b", -2)]));
        assert_eq!(plan(&transfers), vec![("b", "a", 2)]);
    }

    #[test]
    fn open_cent_left_by_a_dust_debtor_is_ignored() {
        // c owes 0.01 and is below the threshold, so a keeps 0.01 open.
        let transfers = suggest_transfers(&balances(&[("a", 5_01), ("b", -5_00), ("c", -1)]));
        assert_eq!(plan(&transfers), vec![("b", "a", 5_00)]);
    }

    #[test]
    fn plan_zeroes_every_balance_within_n_minus_one_transfers() {
        let input = balances(&[
            ("a", 120_00),
            ("b", -45_50),
            ("c", 10_25),
            ("d", -60_00),
            ("e", -24_75),
            ("f", 0),
        ]);
        let transfers = suggest_transfers(&input);
        let non_zero = input.iter().filter(|b| !b.net_balance.is_zero()).count();
        assert!(transfers.len() <= non_zero - 1);

        for member in &input {
            let received: MoneyCents = transfers
                .iter()
                .filter(|t| t.to == member.member_id)
                .map(|t| t.amount)
                .sum();
            let sent: MoneyCents = transfers
                .iter()
                .filter(|t| t.from == member.member_id)
                .map(|t| t.amount)
                .sum();
            assert_eq!(member.net_balance - received + sent, MoneyCents::ZERO);
        }
    }

    #[test]
    fn greedy_plan_is_not_always_minimal() {
        // Optimal is 3 transfers (d4 -> c4, d6 -> c3a + c3b); greedy starts
        // with the largest debtor and needs 4.
        let input = balances(&[
            ("c4", 4_00),
            ("c3a", 3_00),
            ("c3b", 3_00),
            ("d6", -6_00),
            ("d4", -4_00),
        ]);
        assert_eq!(suggest_transfers(&input).len(), 4);
    }
}
