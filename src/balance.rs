// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 The splitledger authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Balance derivation.
//!
//! Pure functions from ledger state to per-member net balances. A positive
//! balance means the member is owed money, a negative one that the member
//! owes. Balances are derived, never stored: recomputing on an unchanged
//! group yields identical results.
//!
//! Shares are rounded to the group currency's minor unit with the
//! largest-remainder method, so the rounded shares of every expense sum to
//! the expense amount exactly and the group total is exactly zero.

use crate::base::MemberId;
use crate::currency::Currency;
use crate::group::{Expense, GroupData};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Net balance per member, including zero balances for members without
/// expenses.
///
/// Per expense, the payer is credited the full amount and every participant
/// is debited its rounded share (a payer who also participates receives
/// both adjustments). Summing the result over all members gives exactly
/// zero.
pub fn balances(group: &GroupData) -> BTreeMap<MemberId, Decimal> {
    let mut totals: BTreeMap<MemberId, Decimal> = group
        .members()
        .iter()
        .map(|m| (m.id, Decimal::ZERO))
        .collect();

    for expense in group.expenses() {
        *totals.entry(expense.payer).or_default() += expense.amount;
        for (participant, share) in expense_shares(expense, group.currency()) {
            *totals.entry(participant).or_default() -= share;
        }
    }

    totals
}

/// Rounded share per participant of one expense, ascending by member id.
///
/// The raw share of participant `p` is `amount x weight(p) / W` where `W`
/// is the sum of all participant weights. Raw shares are truncated to the
/// currency's minor unit; the leftover minor units (the difference between
/// the amount and the truncated sum) go one at a time to the participants
/// with the largest truncated fraction, ties broken by ascending member id.
/// The returned shares therefore always sum to `amount` exactly.
pub fn expense_shares(expense: &Expense, currency: Currency) -> Vec<(MemberId, Decimal)> {
    let scale = currency.exponent();
    let step = currency.minor_unit();

    let total_weight: Decimal = expense
        .participants
        .iter()
        .map(|&p| expense.weight(p))
        .sum();

    // (member, truncated share, truncated-off fraction)
    let mut split: Vec<(MemberId, Decimal, Decimal)> = expense
        .participants
        .iter()
        .map(|&p| {
            let raw = expense.amount * expense.weight(p) / total_weight;
            let share = raw.trunc_with_scale(scale);
            (p, share, raw - share)
        })
        .collect();

    let floored_sum: Decimal = split.iter().map(|(_, share, _)| *share).sum();
    let mut shortfall = expense.amount - floored_sum;

    // Largest remainder first, ascending id on ties. The shortfall is
    // strictly less than one minor unit per participant, so a single pass
    // always exhausts it.
    split.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));
    for row in split.iter_mut() {
        if shortfall < step {
            break;
        }
        row.1 += step;
        shortfall -= step;
    }

    split.sort_by_key(|row| row.0);
    split.into_iter().map(|(p, share, _)| (p, share)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::ExpenseDraft;
    use rust_decimal_macros::dec;

    fn group_of(n: usize) -> (GroupData, Vec<MemberId>) {
        let mut group = GroupData::new("Trip", Currency::Eur);
        let ids = (0..n)
            .map(|i| group.add_member(&format!("Member{i}"), None).id)
            .collect();
        (group, ids)
    }

    #[test]
    fn empty_group_has_no_balances() {
        let group = GroupData::new("Empty", Currency::Eur);
        assert!(balances(&group).is_empty());
    }

    #[test]
    fn members_without_expenses_balance_at_zero() {
        let (group, ids) = group_of(3);
        let result = balances(&group);
        assert_eq!(result.len(), 3);
        assert!(ids.iter().all(|id| result[id] == Decimal::ZERO));
    }

    #[test]
    fn equal_split_three_ways() {
        // Amount 30, payer A, participants {A,B,C}: shares 10 each,
        // balances A:+20 B:-10 C:-10.
        let (mut group, ids) = group_of(3);
        group
            .add_expense(ExpenseDraft::new("Dinner", dec!(30.00), ids[0], ids.clone()))
            .unwrap();

        let result = balances(&group);
        assert_eq!(result[&ids[0]], dec!(20.00));
        assert_eq!(result[&ids[1]], dec!(-10.00));
        assert_eq!(result[&ids[2]], dec!(-10.00));
    }

    #[test]
    fn weighted_split_with_rounding_shortfall() {
        // Amount 100, payer A, participants {B: weight 2, C: weight 1}.
        // Raw shares 66.666... and 33.333...; both truncate down
        // (sum 99.99), and the leftover cent goes to B, the larger
        // remainder. Final: B 66.67, C 33.33.
        let (mut group, ids) = group_of(3);
        let expense = group
            .add_expense(
                ExpenseDraft::new("Hotel", dec!(100.00), ids[0], vec![ids[1], ids[2]])
                    .with_weight(ids[1], dec!(2))
                    .with_weight(ids[2], dec!(1)),
            )
            .unwrap();

        let shares = expense_shares(&expense, Currency::Eur);
        assert_eq!(shares, vec![(ids[1], dec!(66.67)), (ids[2], dec!(33.33))]);

        let result = balances(&group);
        assert_eq!(result[&ids[0]], dec!(100.00));
        assert_eq!(result[&ids[1]], dec!(-66.67));
        assert_eq!(result[&ids[2]], dec!(-33.33));
    }

    #[test]
    fn equal_remainders_break_ties_by_ascending_id() {
        // 100 / 3: every raw share is 33.333..., so the single leftover
        // cent goes to the lowest member id.
        let (mut group, ids) = group_of(3);
        let expense = group
            .add_expense(ExpenseDraft::new("Rent", dec!(100.00), ids[0], ids.clone()))
            .unwrap();

        let shares = expense_shares(&expense, Currency::Eur);
        assert_eq!(
            shares,
            vec![
                (ids[0], dec!(33.34)),
                (ids[1], dec!(33.33)),
                (ids[2], dec!(33.33)),
            ]
        );
    }

    #[test]
    fn shares_sum_to_amount_exactly() {
        let (mut group, ids) = group_of(3);
        let expense = group
            .add_expense(
                ExpenseDraft::new("Groceries", dec!(17.53), ids[0], ids.clone())
                    .with_weight(ids[1], dec!(2.5))
                    .with_weight(ids[2], dec!(0.7)),
            )
            .unwrap();

        let total: Decimal = expense_shares(&expense, Currency::Eur)
            .into_iter()
            .map(|(_, share)| share)
            .sum();
        assert_eq!(total, dec!(17.53));
    }

    #[test]
    fn yen_shares_round_to_whole_units() {
        let mut group = GroupData::new("Tokyo", Currency::Jpy);
        let a = group.add_member("A", None).id;
        let b = group.add_member("B", None).id;
        let c = group.add_member("C", None).id;

        let expense = group
            .add_expense(ExpenseDraft::new("Ramen", dec!(1000), a, vec![a, b, c]))
            .unwrap();

        let shares = expense_shares(&expense, Currency::Jpy);
        assert_eq!(
            shares,
            vec![(a, dec!(334)), (b, dec!(333)), (c, dec!(333))]
        );
    }

    #[test]
    fn payer_outside_participants_is_only_credited() {
        let (mut group, ids) = group_of(2);
        group
            .add_expense(ExpenseDraft::new("Gift", dec!(25.00), ids[0], vec![ids[1]]))
            .unwrap();

        let result = balances(&group);
        assert_eq!(result[&ids[0]], dec!(25.00));
        assert_eq!(result[&ids[1]], dec!(-25.00));
    }

    #[test]
    fn balances_accumulate_across_expenses() {
        let (mut group, ids) = group_of(2);
        group
            .add_expense(ExpenseDraft::new("One", dec!(90.00), ids[0], ids.clone()))
            .unwrap();
        group
            .add_expense(ExpenseDraft::new("Two", dec!(60.00), ids[1], ids.clone()))
            .unwrap();

        let result = balances(&group);
        assert_eq!(result[&ids[0]], dec!(15.00));
        assert_eq!(result[&ids[1]], dec!(-15.00));
    }

    #[test]
    fn group_total_is_exactly_zero() {
        let (mut group, ids) = group_of(4);
        group
            .add_expense(
                ExpenseDraft::new("A", dec!(17.53), ids[0], ids.clone())
                    .with_weight(ids[2], dec!(3)),
            )
            .unwrap();
        group
            .add_expense(ExpenseDraft::new("B", dec!(0.01), ids[3], ids.clone()))
            .unwrap();
        group
            .add_expense(
                ExpenseDraft::new("C", dec!(99.99), ids[1], vec![ids[0], ids[2]])
                    .with_weight(ids[0], dec!(0.1)),
            )
            .unwrap();

        let total: Decimal = balances(&group).values().copied().sum();
        assert_eq!(total, Decimal::ZERO);
    }

    #[test]
    fn recomputation_is_idempotent() {
        let (mut group, ids) = group_of(3);
        group
            .add_expense(
                ExpenseDraft::new("Dinner", dec!(100.00), ids[0], ids.clone())
                    .with_weight(ids[1], dec!(2)),
            )
            .unwrap();

        assert_eq!(balances(&group), balances(&group));
    }
}
