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

//! # Splitledger
//!
//! This library provides the accounting core of a shared-expense service:
//! groups of members record who paid what for whom, and the engine derives
//! each member's net balance and a settlement plan of peer-to-peer
//! transfers that zeroes all balances.
//!
//! ## Core Components
//!
//! - [`Engine`]: Concurrent front managing expense groups
//! - [`GroupData`]: One group's ledger state (members and expenses)
//! - [`balances`]: Pure derivation of net balance per member
//! - [`settle`]: Pure derivation of a transfer plan from a balance map
//! - [`LedgerError`]: Typed errors at the mutation boundary
//!
//! ## Example
//!
//! ```
//! use splitledger::{Currency, Engine, ExpenseDraft};
//! use rust_decimal_macros::dec;
//!
//! let engine = Engine::new();
//! let trip = engine.create_group("Ski trip", Currency::Eur);
//!
//! let ana = engine.add_member(trip, "Ana", None).unwrap();
//! let bo = engine.add_member(trip, "Bo", None).unwrap();
//!
//! // Ana fronts 90.00, split evenly between the two of them.
//! let draft = ExpenseDraft::new("Lift passes", dec!(90.00), ana.id, [ana.id, bo.id]);
//! engine.add_expense(trip, draft).unwrap();
//!
//! let balances = engine.balances(trip).unwrap();
//! assert_eq!(balances[&ana.id], dec!(45.00));
//! assert_eq!(balances[&bo.id], dec!(-45.00));
//!
//! // One transfer settles the group: Bo pays Ana 45.00.
//! let plan = engine.settlements(trip).unwrap();
//! assert_eq!(plan.len(), 1);
//! ```
//!
//! ## Determinism
//!
//! Balances and settlements are pure functions of the group state: shares
//! round to the currency's minor unit with the largest-remainder method
//! (so every expense's shares sum to its amount exactly and the group
//! total is exactly zero), and all ordering ties break by ascending member
//! id. Recomputing on an unchanged group always returns the same result.
//!
//! ## Thread Safety
//!
//! The engine serializes mutations per group while letting different
//! groups proceed in parallel. Balance and settlement derivation run on a
//! snapshot and never hold a lock.

pub mod balance;
mod base;
mod currency;
mod engine;
pub mod error;
mod group;
pub mod settlement;

pub use balance::{balances, expense_shares};
pub use base::{ExpenseId, GroupId, MemberId};
pub use currency::Currency;
pub use engine::{Engine, GroupSummary};
pub use error::{ErrorKind, LedgerError};
pub use group::{Expense, ExpenseDraft, Group, GroupData, Member};
pub use settlement::{Transfer, settle};
