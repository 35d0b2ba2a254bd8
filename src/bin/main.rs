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

use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use splitledger::{
    Currency, Engine, ExpenseDraft, ExpenseId, GroupId, GroupSummary, LedgerError, MemberId,
};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;

/// Splitledger - Process expense group CSV files
///
/// Reads ledger operations from a CSV file and outputs every group's
/// balances and settlement plan to stdout.
#[derive(Parser, Debug)]
#[command(name = "splitledger")]
#[command(about = "A shared-expense engine that processes ledger operation CSVs", long_about = None)]
struct Args {
    /// Path to CSV file with ledger operations
    ///
    /// Expected format: op,group,name,email,description,amount,payer,participants,weights
    /// Example: cargo run -- operations.csv > report.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Currency for every group in the file
    #[arg(long, default_value = "EUR")]
    currency: Currency,
}

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // Open input file
    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    // Process operations from CSV
    let (engine, directory) = match process_operations(BufReader::new(file), args.currency) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error processing operations: {}", e);
            process::exit(1);
        }
    };

    // Write results to stdout
    if let Err(e) = write_report(&engine, &directory, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `op, group, name, email, description, amount, payer,
/// participants, weights`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    op: String,
    group: String,
    name: Option<String>,
    email: Option<String>,
    description: Option<String>,
    #[serde(deserialize_with = "csv::invalid_option")]
    amount: Option<Decimal>,
    payer: Option<String>,
    participants: Option<String>,
    weights: Option<String>,
}

/// A ledger operation with members referenced by name.
///
/// The CSV layer speaks names; [`Directory`] translates them to the ids
/// the engine works with.
#[derive(Debug)]
enum Operation {
    AddMember {
        group: String,
        name: String,
        email: Option<String>,
    },
    RemoveMember {
        group: String,
        name: String,
    },
    AddExpense {
        group: String,
        description: String,
        amount: Decimal,
        payer: String,
        /// Participant names, from a `|`-separated cell.
        participants: Vec<String>,
        /// `name:weight` pairs, from a `|`-separated cell.
        weights: Vec<(String, Decimal)>,
    },
    RemoveExpense {
        group: String,
        description: String,
    },
}

impl CsvRecord {
    /// Converts a CSV record to an [`Operation`].
    ///
    /// Returns `None` for unknown ops or missing required fields.
    fn into_operation(self) -> Option<Operation> {
        let non_empty = |field: Option<String>| field.filter(|s| !s.is_empty());

        match self.op.to_lowercase().as_str() {
            "add_member" => Some(Operation::AddMember {
                group: self.group,
                name: non_empty(self.name)?,
                email: non_empty(self.email),
            }),
            "remove_member" => Some(Operation::RemoveMember {
                group: self.group,
                name: non_empty(self.name)?,
            }),
            "add_expense" => {
                let participants: Vec<String> = non_empty(self.participants)?
                    .split('|')
                    .map(str::to_string)
                    .collect();
                let weights = match non_empty(self.weights) {
                    Some(cell) => parse_weights(&cell)?,
                    None => Vec::new(),
                };
                Some(Operation::AddExpense {
                    group: self.group,
                    description: non_empty(self.description)?,
                    amount: self.amount?,
                    payer: non_empty(self.payer)?,
                    participants,
                    weights,
                })
            }
            "remove_expense" => Some(Operation::RemoveExpense {
                group: self.group,
                description: non_empty(self.description)?,
            }),
            _ => None,
        }
    }
}

/// Parses a `name:weight|name:weight` cell.
fn parse_weights(cell: &str) -> Option<Vec<(String, Decimal)>> {
    cell.split('|')
        .map(|pair| {
            let (name, weight) = pair.split_once(':')?;
            Some((name.to_string(), weight.parse().ok()?))
        })
        .collect()
}

/// Name-to-id translation built up while processing operations.
///
/// Groups are created on first reference; members and expenses are
/// registered as the engine assigns their ids. Re-adding a name rebinds it
/// to the newest id, matching how the rows that follow read.
#[derive(Debug, Default)]
pub struct Directory {
    groups: HashMap<String, GroupId>,
    members: HashMap<(GroupId, String), MemberId>,
    expenses: HashMap<(GroupId, String), ExpenseId>,
}

impl Directory {
    pub fn group(&self, name: &str) -> Option<GroupId> {
        self.groups.get(name).copied()
    }

    pub fn member(&self, group: GroupId, name: &str) -> Option<MemberId> {
        self.members.get(&(group, name.to_string())).copied()
    }

    /// Group names sorted by group id, for stable report order.
    fn group_names(&self) -> Vec<(&str, GroupId)> {
        let mut names: Vec<(&str, GroupId)> = self
            .groups
            .iter()
            .map(|(name, &id)| (name.as_str(), id))
            .collect();
        names.sort_by_key(|&(_, id)| id);
        names
    }
}

/// Why an operation could not be applied.
#[derive(Debug)]
enum SkipReason {
    UnknownName,
    Ledger(LedgerError),
}

/// Resolves names and applies one operation to the engine.
fn apply(
    engine: &Engine,
    directory: &mut Directory,
    currency: Currency,
    operation: Operation,
) -> Result<(), SkipReason> {
    let group_of = |directory: &mut Directory, name: &str| {
        *directory
            .groups
            .entry(name.to_string())
            .or_insert_with(|| engine.create_group(name, currency))
    };

    match operation {
        Operation::AddMember { group, name, email } => {
            let group_id = group_of(directory, &group);
            let member = engine
                .add_member(group_id, &name, email.as_deref())
                .map_err(SkipReason::Ledger)?;
            directory.members.insert((group_id, name), member.id);
        }
        Operation::RemoveMember { group, name } => {
            let group_id = directory.group(&group).ok_or(SkipReason::UnknownName)?;
            let member_id = directory
                .member(group_id, &name)
                .ok_or(SkipReason::UnknownName)?;
            engine
                .remove_member(group_id, member_id)
                .map_err(SkipReason::Ledger)?;
            directory.members.remove(&(group_id, name));
        }
        Operation::AddExpense {
            group,
            description,
            amount,
            payer,
            participants,
            weights,
        } => {
            let group_id = directory.group(&group).ok_or(SkipReason::UnknownName)?;
            let payer_id = directory
                .member(group_id, &payer)
                .ok_or(SkipReason::UnknownName)?;
            let participant_ids = participants
                .iter()
                .map(|name| directory.member(group_id, name))
                .collect::<Option<Vec<MemberId>>>()
                .ok_or(SkipReason::UnknownName)?;

            let mut draft = ExpenseDraft::new(description.clone(), amount, payer_id, participant_ids);
            for (name, weight) in weights {
                let member_id = directory
                    .member(group_id, &name)
                    .ok_or(SkipReason::UnknownName)?;
                draft = draft.with_weight(member_id, weight);
            }

            let expense = engine
                .add_expense(group_id, draft)
                .map_err(SkipReason::Ledger)?;
            directory.expenses.insert((group_id, description), expense.id);
        }
        Operation::RemoveExpense { group, description } => {
            let group_id = directory.group(&group).ok_or(SkipReason::UnknownName)?;
            let expense_id = directory
                .expenses
                .get(&(group_id, description.clone()))
                .copied()
                .ok_or(SkipReason::UnknownName)?;
            engine
                .remove_expense(group_id, expense_id)
                .map_err(SkipReason::Ledger)?;
            directory.expenses.remove(&(group_id, description));
        }
    }

    Ok(())
}

/// Process ledger operations from a CSV reader.
///
/// This function uses streaming parsing to handle arbitrarily large CSV
/// files without loading the entire file into memory. Malformed rows and
/// rejected operations are skipped.
///
/// # CSV Format
///
/// Expected columns: `op, group, name, email, description, amount, payer,
/// participants, weights`
/// - `op`: add_member, remove_member, add_expense, remove_expense
/// - `group`: Group name (created on first reference)
/// - `name`/`email`: Member fields (member ops)
/// - `description`/`amount`/`payer`/`participants`/`weights`: Expense
///   fields; participants are `|`-separated member names, weights are
///   `name:weight` pairs, also `|`-separated
///
/// # Example
///
/// ```csv
/// op,group,name,email,description,amount,payer,participants,weights
/// add_member,trip,Ana,ana@example.com,,,,,
/// add_member,trip,Bo,,,,,,
/// add_expense,trip,,,Dinner,60.00,Ana,Ana|Bo,Bo:2
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is
/// invalid. Individual operation errors are logged in debug mode but don't
/// stop processing.
pub fn process_operations<R: Read>(
    reader: R,
    currency: Currency,
) -> Result<(Engine, Directory), csv::Error> {
    let engine = Engine::new();
    let mut directory = Directory::default();

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All) // Handle whitespace in fields like " add_member "
        .flexible(true) // Allow missing trailing fields
        .has_headers(true) // Skip first row as header
        .from_reader(reader);

    for result in rdr.deserialize::<CsvRecord>() {
        match result {
            Ok(record) => {
                // Convert CSV record to a ledger operation
                let Some(operation) = record.into_operation() else {
                    #[cfg(debug_assertions)]
                    eprintln!("Skipping invalid operation record");
                    continue;
                };

                // Apply the operation, ignoring errors (silent failure)
                if let Err(_reason) = apply(&engine, &mut directory, currency, operation) {
                    #[cfg(debug_assertions)]
                    eprintln!("Skipping operation: {:?}", _reason);
                }
            }
            Err(e) => {
                // Skip malformed rows
                #[cfg(debug_assertions)]
                eprintln!("Skipping malformed row: {}", e);
                continue;
            }
        }
    }

    Ok((engine, directory))
}

/// Balance output row with member names resolved.
#[derive(Debug, Serialize)]
struct BalanceRow {
    group: String,
    member: String,
    balance: Decimal,
}

/// Settlement output row with member names resolved.
#[derive(Debug, Serialize)]
struct SettlementRow {
    group: String,
    from: String,
    to: String,
    amount: Decimal,
}

/// Write every group's balances and settlement plan to a writer.
///
/// Outputs two CSV tables separated by a blank line: balances
/// (`group, member, balance`, one row per member in insertion order) and
/// settlements (`group, from, to, amount`, in plan order).
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_report<W: Write>(
    engine: &Engine,
    directory: &Directory,
    mut writer: W,
) -> Result<(), csv::Error> {
    let summaries: Vec<(String, GroupSummary)> = directory
        .group_names()
        .into_iter()
        .filter_map(|(name, id)| Some((name.to_string(), engine.summary(id).ok()?)))
        .collect();

    let member_name = |summary: &GroupSummary, id: MemberId| {
        summary
            .members
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.name.clone())
            .unwrap_or_else(|| id.to_string())
    };

    let mut balances = Writer::from_writer(&mut writer);
    for (group, summary) in &summaries {
        for member in &summary.members {
            balances.serialize(BalanceRow {
                group: group.clone(),
                member: member.name.clone(),
                balance: summary.balances[&member.id],
            })?;
        }
    }
    balances.flush()?;
    drop(balances);

    writeln!(writer)?;

    let mut settlements = Writer::from_writer(&mut writer);
    for (group, summary) in &summaries {
        for transfer in &summary.settlements {
            settlements.serialize(SettlementRow {
                group: group.clone(),
                from: member_name(summary, transfer.from),
                to: member_name(summary, transfer.to),
                amount: transfer.amount,
            })?;
        }
    }
    settlements.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Cursor;

    fn run(csv: &str) -> (Engine, Directory) {
        process_operations(Cursor::new(csv), Currency::Eur).unwrap()
    }

    #[test]
    fn parse_members_and_expense() {
        let csv = "op,group,name,email,description,amount,payer,participants,weights\n\
                   add_member,trip,Ana,ana@example.com,,,,,\n\
                   add_member,trip,Bo,,,,,,\n\
                   add_expense,trip,,,Dinner,60.00,Ana,Ana|Bo,\n";
        let (engine, directory) = run(csv);

        let group = directory.group("trip").unwrap();
        let ana = directory.member(group, "Ana").unwrap();
        let bo = directory.member(group, "Bo").unwrap();

        let balances = engine.balances(group).unwrap();
        assert_eq!(balances[&ana], dec!(30.00));
        assert_eq!(balances[&bo], dec!(-30.00));
    }

    #[test]
    fn parse_weighted_expense() {
        let csv = "op,group,name,email,description,amount,payer,participants,weights\n\
                   add_member,trip,Ana,,,,,,\n\
                   add_member,trip,Bo,,,,,,\n\
                   add_member,trip,Cleo,,,,,,\n\
                   add_expense,trip,,,Hotel,100.00,Ana,Bo|Cleo,Bo:2|Cleo:1\n";
        let (engine, directory) = run(csv);

        let group = directory.group("trip").unwrap();
        let balances = engine.balances(group).unwrap();
        assert_eq!(balances[&directory.member(group, "Ana").unwrap()], dec!(100.00));
        assert_eq!(balances[&directory.member(group, "Bo").unwrap()], dec!(-66.67));
        assert_eq!(balances[&directory.member(group, "Cleo").unwrap()], dec!(-33.33));
    }

    #[test]
    fn parse_remove_operations() {
        let csv = "op,group,name,email,description,amount,payer,participants,weights\n\
                   add_member,trip,Ana,,,,,,\n\
                   add_member,trip,Bo,,,,,,\n\
                   add_expense,trip,,,Dinner,60.00,Ana,Ana|Bo,\n\
                   remove_expense,trip,,,Dinner,,,,\n\
                   remove_member,trip,Bo,,,,,,\n";
        let (engine, directory) = run(csv);

        let group = directory.group("trip").unwrap();
        let summary = engine.summary(group).unwrap();
        assert_eq!(summary.members.len(), 1);
        assert!(summary.expenses.is_empty());
        assert!(summary.settlements.is_empty());
    }

    #[test]
    fn referenced_member_removal_is_skipped() {
        let csv = "op,group,name,email,description,amount,payer,participants,weights\n\
                   add_member,trip,Ana,,,,,,\n\
                   add_member,trip,Bo,,,,,,\n\
                   add_expense,trip,,,Dinner,60.00,Ana,Ana|Bo,\n\
                   remove_member,trip,Bo,,,,,,\n";
        let (engine, directory) = run(csv);

        // The removal is rejected by the engine and skipped; Bo stays.
        let group = directory.group("trip").unwrap();
        assert_eq!(engine.summary(group).unwrap().members.len(), 2);
    }

    #[test]
    fn skip_malformed_rows() {
        let csv = "op,group,name,email,description,amount,payer,participants,weights\n\
                   add_member,trip,Ana,,,,,,\n\
                   not_an_op,trip,,,,,,,\n\
                   add_expense,trip,,,Broken,not-a-number,Ana,Ana,\n\
                   add_member,trip,Bo,,,,,,\n";
        let (engine, directory) = run(csv);

        let group = directory.group("trip").unwrap();
        let summary = engine.summary(group).unwrap();
        assert_eq!(summary.members.len(), 2); // Two valid add_member rows
        assert!(summary.expenses.is_empty());
    }

    #[test]
    fn parse_with_whitespace() {
        let csv = "op,group,name,email,description,amount,payer,participants,weights\n\
                    add_member , trip , Ana ,,,,,,\n";
        let (engine, directory) = run(csv);

        let group = directory.group("trip").unwrap();
        assert_eq!(engine.summary(group).unwrap().members.len(), 1);
    }

    #[test]
    fn multiple_groups_are_independent() {
        let csv = "op,group,name,email,description,amount,payer,participants,weights\n\
                   add_member,trip,Ana,,,,,,\n\
                   add_member,flat,Ana,,,,,,\n\
                   add_member,flat,Bo,,,,,,\n\
                   add_expense,flat,,,Rent,900.00,Ana,Ana|Bo,\n";
        let (engine, directory) = run(csv);

        let trip = directory.group("trip").unwrap();
        let flat = directory.group("flat").unwrap();
        assert!(engine.summary(trip).unwrap().expenses.is_empty());
        assert_eq!(engine.summary(flat).unwrap().expenses.len(), 1);
    }

    #[test]
    fn report_contains_both_sections() {
        let csv = "op,group,name,email,description,amount,payer,participants,weights\n\
                   add_member,trip,Ana,,,,,,\n\
                   add_member,trip,Bo,,,,,,\n\
                   add_expense,trip,,,Dinner,60.00,Ana,Ana|Bo,\n";
        let (engine, directory) = run(csv);

        let mut output = Vec::new();
        write_report(&engine, &directory, &mut output).unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(output.contains("group,member,balance"));
        assert!(output.contains("trip,Ana,30.00"));
        assert!(output.contains("group,from,to,amount"));
        assert!(output.contains("trip,Bo,Ana,30.00"));
    }
}
