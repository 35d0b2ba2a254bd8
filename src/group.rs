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

//! Group ledger: members, expenses, and the mutations that maintain them.
//!
//! [`GroupData`] is the ledger state proper — a plain, cloneable snapshot
//! that balance and settlement derivation consume. [`Group`] wraps it in a
//! mutex so concurrent mutations against the same group serialize.
//!
//! # Invariants
//!
//! After every successful mutation:
//! - every expense amount is positive and representable in the group
//!   currency's minor unit,
//! - every expense's payer and participants reference current members,
//! - every weight is positive and keyed on a participant,
//! - member and expense ids are unique for the group's lifetime (ids of
//!   removed entries are never handed out again).
//!
//! A failed mutation returns exactly one [`LedgerError`] and leaves the
//! state untouched.

use crate::LedgerError;
use crate::base::{ExpenseId, MemberId};
use crate::currency::Currency;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A person participating in a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Link to an external identity (set when restoring a persisted
    /// snapshot; the join workflow that establishes it lives outside the
    /// engine).
    #[serde(default)]
    pub external_id: Option<String>,
}

/// A recorded expense: the payer fronted `amount` for the participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub description: String,
    pub amount: Decimal,
    pub payer: MemberId,
    pub participants: BTreeSet<MemberId>,
    /// Share weights; participants absent from the map weigh 1.
    #[serde(default)]
    pub weights: BTreeMap<MemberId, Decimal>,
}

impl Expense {
    /// The share weight of a participant (1 when unspecified).
    pub fn weight(&self, member: MemberId) -> Decimal {
        self.weights.get(&member).copied().unwrap_or(Decimal::ONE)
    }
}

/// Input value object for [`GroupData::add_expense`].
///
/// Carries everything an expense needs except the id, which the ledger
/// assigns on append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseDraft {
    pub description: String,
    pub amount: Decimal,
    pub payer: MemberId,
    pub participants: BTreeSet<MemberId>,
    pub weights: BTreeMap<MemberId, Decimal>,
}

impl ExpenseDraft {
    /// Draft with an equal split (no weights) among `participants`.
    pub fn new(
        description: impl Into<String>,
        amount: Decimal,
        payer: MemberId,
        participants: impl IntoIterator<Item = MemberId>,
    ) -> Self {
        Self {
            description: description.into(),
            amount,
            payer,
            participants: participants.into_iter().collect(),
            weights: BTreeMap::new(),
        }
    }

    /// Sets the weight of one participant.
    pub fn with_weight(mut self, member: MemberId, weight: Decimal) -> Self {
        self.weights.insert(member, weight);
        self
    }
}

/// Ledger state of one group: members and expenses in insertion order.
///
/// This is the snapshot type the surrounding persistence layer loads and
/// stores, and the input to [`balances`](crate::balance::balances). The id
/// counters are part of the snapshot so the no-reuse guarantee survives a
/// round-trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupData {
    name: String,
    currency: Currency,
    members: Vec<Member>,
    expenses: Vec<Expense>,
    next_member_id: u32,
    next_expense_id: u32,
}

impl GroupData {
    /// Creates an empty group.
    pub fn new(name: &str, currency: Currency) -> Self {
        Self {
            name: name.to_string(),
            currency,
            members: Vec::new(),
            expenses: Vec::new(),
            next_member_id: 1,
            next_expense_id: 1,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Members in insertion order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Expenses in insertion order (chronological).
    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    /// Looks up a member by id.
    pub fn member(&self, id: MemberId) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }

    /// Looks up an expense by id.
    pub fn expense(&self, id: ExpenseId) -> Option<&Expense> {
        self.expenses.iter().find(|e| e.id == id)
    }

    fn contains_member(&self, id: MemberId) -> bool {
        self.members.iter().any(|m| m.id == id)
    }

    fn assert_invariants(&self) {
        for expense in &self.expenses {
            debug_assert!(
                expense.amount > Decimal::ZERO,
                "Invariant violated: non-positive expense amount: {}",
                expense.amount
            );
            debug_assert!(
                self.contains_member(expense.payer),
                "Invariant violated: expense {} has unknown payer",
                expense.id
            );
            debug_assert!(
                expense.participants.iter().all(|&p| self.contains_member(p)),
                "Invariant violated: expense {} has unknown participant",
                expense.id
            );
        }
    }

    /// Appends a new member with a fresh id.
    ///
    /// Names and emails carry no uniqueness constraint.
    pub fn add_member(&mut self, name: &str, email: Option<&str>) -> Member {
        let member = Member {
            id: MemberId(self.next_member_id),
            name: name.to_string(),
            email: email.map(str::to_string),
            external_id: None,
        };
        self.next_member_id += 1;
        self.members.push(member.clone());
        member
    }

    /// Removes a member that no expense references.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::MemberNotFound`] - No member with this id.
    /// - [`LedgerError::MemberInUse`] - The member is payer or participant
    ///   of an existing expense; the deletion is rejected, never silently
    ///   ignored.
    pub fn remove_member(&mut self, id: MemberId) -> Result<(), LedgerError> {
        let index = self
            .members
            .iter()
            .position(|m| m.id == id)
            .ok_or(LedgerError::MemberNotFound)?;

        let referenced = self
            .expenses
            .iter()
            .any(|e| e.payer == id || e.participants.contains(&id));
        if referenced {
            return Err(LedgerError::MemberInUse);
        }

        self.members.remove(index);
        self.assert_invariants();
        Ok(())
    }

    /// Validates a draft against the group invariants and appends it with a
    /// fresh id.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - Amount is zero or negative.
    /// - [`LedgerError::AmountPrecision`] - Amount is finer than the group
    ///   currency's minor unit.
    /// - [`LedgerError::NoParticipants`] - Empty participant set.
    /// - [`LedgerError::UnknownMember`] - Payer or a participant is not a
    ///   member of the group.
    /// - [`LedgerError::UnknownWeightParticipant`] - A weight is keyed on a
    ///   member outside the participant set.
    /// - [`LedgerError::InvalidWeight`] - A weight is zero or negative.
    pub fn add_expense(&mut self, draft: ExpenseDraft) -> Result<Expense, LedgerError> {
        if draft.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        if draft.amount != draft.amount.trunc_with_scale(self.currency.exponent()) {
            return Err(LedgerError::AmountPrecision);
        }
        if draft.participants.is_empty() {
            return Err(LedgerError::NoParticipants);
        }
        if !self.contains_member(draft.payer) {
            return Err(LedgerError::UnknownMember);
        }
        if !draft.participants.iter().all(|&p| self.contains_member(p)) {
            return Err(LedgerError::UnknownMember);
        }
        for (member, weight) in &draft.weights {
            if !draft.participants.contains(member) {
                return Err(LedgerError::UnknownWeightParticipant);
            }
            if *weight <= Decimal::ZERO {
                return Err(LedgerError::InvalidWeight);
            }
        }

        let expense = Expense {
            id: ExpenseId(self.next_expense_id),
            description: draft.description,
            amount: draft.amount,
            payer: draft.payer,
            participants: draft.participants,
            weights: draft.weights,
        };
        self.next_expense_id += 1;
        self.expenses.push(expense.clone());
        self.assert_invariants();
        Ok(expense)
    }

    /// Removes an expense unconditionally.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ExpenseNotFound`] - No expense with this id.
    pub fn remove_expense(&mut self, id: ExpenseId) -> Result<(), LedgerError> {
        let index = self
            .expenses
            .iter()
            .position(|e| e.id == id)
            .ok_or(LedgerError::ExpenseNotFound)?;
        self.expenses.remove(index);
        self.assert_invariants();
        Ok(())
    }
}

/// Runtime group entity.
///
/// Wraps the ledger state in a mutex: mutations against the same group
/// serialize, reads take a consistent snapshot and derive balances and
/// settlements without holding the lock.
#[derive(Debug)]
pub struct Group {
    inner: Mutex<GroupData>,
}

impl Group {
    pub fn new(name: &str, currency: Currency) -> Self {
        Self {
            inner: Mutex::new(GroupData::new(name, currency)),
        }
    }

    /// Wraps a persisted snapshot.
    pub fn from_data(data: GroupData) -> Self {
        Self {
            inner: Mutex::new(data),
        }
    }

    /// A consistent snapshot of the ledger state.
    pub fn data(&self) -> GroupData {
        self.inner.lock().clone()
    }

    pub fn add_member(&self, name: &str, email: Option<&str>) -> Member {
        self.inner.lock().add_member(name, email)
    }

    pub fn remove_member(&self, id: MemberId) -> Result<(), LedgerError> {
        self.inner.lock().remove_member(id)
    }

    pub fn add_expense(&self, draft: ExpenseDraft) -> Result<Expense, LedgerError> {
        self.inner.lock().add_expense(draft)
    }

    pub fn remove_expense(&self, id: ExpenseId) -> Result<(), LedgerError> {
        self.inner.lock().remove_expense(id)
    }
}
