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

//! Multi-group ledger engine.
//!
//! The [`Engine`] is the concurrent front of the crate: it keeps every
//! group behind a [`DashMap`] entry and routes mutations and reads to it.
//! Mutations on the same group serialize on the group's lock; mutations on
//! different groups proceed in parallel. Reads snapshot the group state and
//! derive balances and settlements without holding any lock.
//!
//! # Invariants
//!
//! - Group ids are allocated from a process-wide counter and never reused.
//! - Every mutation either succeeds or fails with one [`LedgerError`] and
//!   leaves the group unchanged.
//! - Derived values (balances, settlements) are never stored; each read
//!   recomputes them from the current group state.

use crate::balance::balances;
use crate::base::{ExpenseId, GroupId, MemberId};
use crate::currency::Currency;
use crate::group::{Expense, ExpenseDraft, Group, GroupData, Member};
use crate::settlement::{Transfer, settle};
use crate::LedgerError;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Combined read-path view of one group: metadata, members, expenses, and
/// the derived balances and settlement plan, all from one consistent
/// snapshot. This is the shape a surrounding API layer serializes to its
/// clients.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub id: GroupId,
    pub name: String,
    pub currency: Currency,
    pub members: Vec<Member>,
    pub expenses: Vec<Expense>,
    pub balances: BTreeMap<MemberId, Decimal>,
    pub settlements: Vec<Transfer>,
}

/// Ledger engine managing expense groups.
pub struct Engine {
    /// Groups indexed by group id.
    groups: DashMap<GroupId, Group>,
    /// Next group id; never decremented, so ids are never reused.
    next_group_id: AtomicU64,
}

impl Engine {
    /// Creates a new engine with no groups.
    pub fn new() -> Self {
        Engine {
            groups: DashMap::new(),
            next_group_id: AtomicU64::new(1),
        }
    }

    /// Creates an empty group and returns its id.
    pub fn create_group(&self, name: &str, currency: Currency) -> GroupId {
        let id = GroupId(self.next_group_id.fetch_add(1, Ordering::Relaxed));
        self.groups.insert(id, Group::new(name, currency));
        id
    }

    /// Registers a persisted group snapshot under a fresh id.
    ///
    /// This is the load half of the persistence seam: the surrounding layer
    /// deserializes a [`GroupData`] it stored earlier and hands it back to
    /// the engine.
    pub fn restore_group(&self, data: GroupData) -> GroupId {
        let id = GroupId(self.next_group_id.fetch_add(1, Ordering::Relaxed));
        self.groups.insert(id, Group::from_data(data));
        id
    }

    /// Deletes a group and everything in it.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::GroupNotFound`] - No group with this id.
    pub fn remove_group(&self, group_id: GroupId) -> Result<(), LedgerError> {
        self.groups
            .remove(&group_id)
            .map(|_| ())
            .ok_or(LedgerError::GroupNotFound)
    }

    /// Appends a member to a group.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::GroupNotFound`] - No group with this id.
    pub fn add_member(
        &self,
        group_id: GroupId,
        name: &str,
        email: Option<&str>,
    ) -> Result<Member, LedgerError> {
        let group = self.groups.get(&group_id).ok_or(LedgerError::GroupNotFound)?;
        Ok(group.add_member(name, email))
    }

    /// Removes a member that no expense references.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::GroupNotFound`] - No group with this id.
    /// - [`LedgerError::MemberNotFound`] - No member with this id.
    /// - [`LedgerError::MemberInUse`] - The member is referenced by an
    ///   expense.
    pub fn remove_member(
        &self,
        group_id: GroupId,
        member_id: MemberId,
    ) -> Result<(), LedgerError> {
        let group = self.groups.get(&group_id).ok_or(LedgerError::GroupNotFound)?;
        group.remove_member(member_id)
    }

    /// Validates and appends an expense.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::GroupNotFound`] - No group with this id.
    /// - Any validation error from [`GroupData::add_expense`].
    pub fn add_expense(
        &self,
        group_id: GroupId,
        draft: ExpenseDraft,
    ) -> Result<Expense, LedgerError> {
        let group = self.groups.get(&group_id).ok_or(LedgerError::GroupNotFound)?;
        group.add_expense(draft)
    }

    /// Removes an expense unconditionally.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::GroupNotFound`] - No group with this id.
    /// - [`LedgerError::ExpenseNotFound`] - No expense with this id.
    pub fn remove_expense(
        &self,
        group_id: GroupId,
        expense_id: ExpenseId,
    ) -> Result<(), LedgerError> {
        let group = self.groups.get(&group_id).ok_or(LedgerError::GroupNotFound)?;
        group.remove_expense(expense_id)
    }

    /// A consistent snapshot of a group's ledger state.
    pub fn group_data(&self, group_id: GroupId) -> Result<GroupData, LedgerError> {
        let group = self.groups.get(&group_id).ok_or(LedgerError::GroupNotFound)?;
        Ok(group.data())
    }

    /// Net balance per member, derived from the current state.
    pub fn balances(&self, group_id: GroupId) -> Result<BTreeMap<MemberId, Decimal>, LedgerError> {
        Ok(balances(&self.group_data(group_id)?))
    }

    /// Settlement plan for the current balances.
    pub fn settlements(&self, group_id: GroupId) -> Result<Vec<Transfer>, LedgerError> {
        Ok(settle(&balances(&self.group_data(group_id)?)))
    }

    /// The full read-path view: members, expenses, balances, and the
    /// settlement plan from one snapshot.
    pub fn summary(&self, group_id: GroupId) -> Result<GroupSummary, LedgerError> {
        let data = self.group_data(group_id)?;
        let balances = balances(&data);
        let settlements = settle(&balances);
        Ok(GroupSummary {
            id: group_id,
            name: data.name().to_string(),
            currency: data.currency(),
            members: data.members().to_vec(),
            expenses: data.expenses().to_vec(),
            balances,
            settlements,
        })
    }

    /// Ids of all groups, ascending.
    pub fn group_ids(&self) -> Vec<GroupId> {
        let mut ids: Vec<GroupId> = self.groups.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
