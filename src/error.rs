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

//! Error types for ledger mutations.
//!
//! All validation happens at the mutation boundary: a mutation either
//! succeeds or fails with exactly one [`LedgerError`] and leaves the group
//! unchanged. Balance and settlement derivation never fail on a group that
//! passed mutation validation.

use thiserror::Error;

/// Ledger mutation errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    /// Expense amount is zero or negative
    #[error("invalid amount (must be positive)")]
    InvalidAmount,

    /// Expense amount is finer than the currency's minor unit
    #[error("amount exceeds the currency's minor-unit precision")]
    AmountPrecision,

    /// Expense has no participants
    #[error("expense requires at least one participant")]
    NoParticipants,

    /// Payer or participant id does not reference a group member
    #[error("payer or participant is not a member of the group")]
    UnknownMember,

    /// A share weight is zero or negative
    #[error("invalid weight (must be positive)")]
    InvalidWeight,

    /// A weight is keyed on a member that is not a participant
    #[error("weight refers to a non-participant")]
    UnknownWeightParticipant,

    /// Referenced group id does not exist
    #[error("group not found")]
    GroupNotFound,

    /// Referenced member id does not exist in the group
    #[error("member not found")]
    MemberNotFound,

    /// Referenced expense id does not exist in the group
    #[error("expense not found")]
    ExpenseNotFound,

    /// Member removal blocked: the member is payer or participant of an expense
    #[error("member is referenced by an expense")]
    MemberInUse,
}

/// Coarse error classification for callers that map errors to transport
/// responses (e.g. HTTP status codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-invariant mutation input.
    Validation,
    /// The operation targeted an id that does not exist.
    NotFound,
    /// Removal blocked by an existing reference.
    InUse,
}

impl LedgerError {
    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidAmount
            | LedgerError::AmountPrecision
            | LedgerError::NoParticipants
            | LedgerError::UnknownMember
            | LedgerError::InvalidWeight
            | LedgerError::UnknownWeightParticipant => ErrorKind::Validation,
            LedgerError::GroupNotFound
            | LedgerError::MemberNotFound
            | LedgerError::ExpenseNotFound => ErrorKind::NotFound,
            LedgerError::MemberInUse => ErrorKind::InUse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, LedgerError};

    #[test]
    fn error_display_messages() {
        assert_eq!(
            LedgerError::InvalidAmount.to_string(),
            "invalid amount (must be positive)"
        );
        assert_eq!(
            LedgerError::AmountPrecision.to_string(),
            "amount exceeds the currency's minor-unit precision"
        );
        assert_eq!(
            LedgerError::NoParticipants.to_string(),
            "expense requires at least one participant"
        );
        assert_eq!(
            LedgerError::UnknownMember.to_string(),
            "payer or participant is not a member of the group"
        );
        assert_eq!(
            LedgerError::InvalidWeight.to_string(),
            "invalid weight (must be positive)"
        );
        assert_eq!(
            LedgerError::UnknownWeightParticipant.to_string(),
            "weight refers to a non-participant"
        );
        assert_eq!(LedgerError::GroupNotFound.to_string(), "group not found");
        assert_eq!(LedgerError::MemberNotFound.to_string(), "member not found");
        assert_eq!(LedgerError::ExpenseNotFound.to_string(), "expense not found");
        assert_eq!(
            LedgerError::MemberInUse.to_string(),
            "member is referenced by an expense"
        );
    }

    #[test]
    fn errors_classify_into_taxonomy() {
        assert_eq!(LedgerError::InvalidAmount.kind(), ErrorKind::Validation);
        assert_eq!(LedgerError::AmountPrecision.kind(), ErrorKind::Validation);
        assert_eq!(LedgerError::NoParticipants.kind(), ErrorKind::Validation);
        assert_eq!(LedgerError::UnknownMember.kind(), ErrorKind::Validation);
        assert_eq!(LedgerError::InvalidWeight.kind(), ErrorKind::Validation);
        assert_eq!(
            LedgerError::UnknownWeightParticipant.kind(),
            ErrorKind::Validation
        );
        assert_eq!(LedgerError::GroupNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(LedgerError::MemberNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(LedgerError::ExpenseNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(LedgerError::MemberInUse.kind(), ErrorKind::InUse);
    }

    #[test]
    fn errors_are_copyable() {
        let error = LedgerError::MemberInUse;
        let copied = error;
        assert_eq!(error, copied);
    }
}
