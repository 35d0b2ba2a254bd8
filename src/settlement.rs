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

//! Settlement planning.
//!
//! Turns a balance map into an ordered list of peer-to-peer transfers that
//! zeroes every balance. The plan is produced by greedy largest-pair
//! matching: repeatedly settle the largest debtor against the largest
//! creditor. This is a deterministic heuristic bounded by N-1 transfers for
//! N nonzero balances, not a globally minimal solver.

use crate::base::MemberId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One suggested transfer: `from` pays `amount` to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: MemberId,
    pub to: MemberId,
    pub amount: Decimal,
}

/// Computes a transfer plan that zeroes the given balances.
///
/// Members with zero balance are ignored. While creditors and debtors
/// remain, the largest creditor and the largest debtor (ties broken by
/// ascending member id) exchange `min(credit, debt)`; whichever side
/// reaches zero drops out. Because the balances of a valid ledger sum to
/// zero, both sides empty simultaneously.
///
/// Applying the returned transfers (`balance[from] += amount`,
/// `balance[to] -= amount`) zeroes every balance exactly, and the plan
/// holds at most `N - 1` transfers for `N` nonzero balances.
pub fn settle(balances: &BTreeMap<MemberId, Decimal>) -> Vec<Transfer> {
    let mut creditors: Vec<(MemberId, Decimal)> = balances
        .iter()
        .filter(|&(_, &balance)| balance > Decimal::ZERO)
        .map(|(&id, &balance)| (id, balance))
        .collect();
    let mut debtors: Vec<(MemberId, Decimal)> = balances
        .iter()
        .filter(|&(_, &balance)| balance < Decimal::ZERO)
        .map(|(&id, &balance)| (id, -balance))
        .collect();

    let mut transfers = Vec::new();

    while !creditors.is_empty() && !debtors.is_empty() {
        let c = largest(&creditors);
        let d = largest(&debtors);

        let amount = creditors[c].1.min(debtors[d].1);
        transfers.push(Transfer {
            from: debtors[d].0,
            to: creditors[c].0,
            amount,
        });

        creditors[c].1 -= amount;
        debtors[d].1 -= amount;
        if creditors[c].1.is_zero() {
            creditors.remove(c);
        }
        if debtors[d].1.is_zero() {
            debtors.remove(d);
        }
    }

    transfers
}

/// Index of the entry with the largest amount; lowest member id on ties.
fn largest(entries: &[(MemberId, Decimal)]) -> usize {
    let mut best = 0;
    for (i, entry) in entries.iter().enumerate().skip(1) {
        let (best_id, best_amount) = entries[best];
        if entry.1 > best_amount || (entry.1 == best_amount && entry.0 < best_id) {
            best = i;
        }
    }
    best
}
