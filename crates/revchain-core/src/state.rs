//! In-memory schema model
//!
//! `SchemaState` tracks tables and their columns and applies `SchemaOp`s with
//! the same existence checks a live database performs. It backs dry runs,
//! the reversibility checker and the in-memory backend.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::errors::SchemaError;
use crate::model::{ColumnDef, SchemaOp};

/// Tables and their columns, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SchemaState {
    tables: BTreeMap<String, Vec<ColumnDef>>,
}

impl SchemaState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.table_key(table).is_some()
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.column(table, column).is_some()
    }

    pub fn column(&self, table: &str, column: &str) -> Option<&ColumnDef> {
        self.columns(table)
            .and_then(|cols| cols.iter().find(|c| same_name(&c.name, column)))
    }

    /// Columns of `table`; names match ASCII case-insensitively, as in SQLite
    pub fn columns(&self, table: &str) -> Option<&[ColumnDef]> {
        self.tables
            .iter()
            .find(|(name, _)| same_name(name, table))
            .map(|(_, cols)| cols.as_slice())
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Insert a table as found by introspection, replacing any previous definition
    pub fn insert_table(&mut self, table: impl Into<String>, columns: Vec<ColumnDef>) {
        self.tables.insert(table.into(), columns);
    }

    /// Compare ignoring column order
    ///
    /// A column dropped and re-added lands at the end of its table, so order
    /// is not part of the observable schema.
    pub fn observably_eq(&self, other: &SchemaState) -> bool {
        if self.tables.len() != other.tables.len() {
            return false;
        }
        self.tables.iter().all(|(name, cols)| {
            let Some(other_cols) = other.tables.get(name) else {
                return false;
            };
            cols.len() == other_cols.len()
                && cols
                    .iter()
                    .all(|c| other_cols.iter().any(|o| o == c))
        })
    }

    /// Apply one operation; on error the state is left untouched
    ///
    /// # Errors
    ///
    /// Returns a `SchemaError` when the operation's target is missing, its
    /// result already exists, or the column definition cannot be added.
    pub fn apply(&mut self, op: &SchemaOp) -> Result<(), SchemaError> {
        match op {
            SchemaOp::CreateTable { table, columns } => {
                if self.has_table(table) {
                    return Err(SchemaError::TableAlreadyExists {
                        table: table.clone(),
                    });
                }
                if columns.is_empty() {
                    return Err(SchemaError::EmptyTable {
                        table: table.clone(),
                    });
                }
                for (i, col) in columns.iter().enumerate() {
                    if columns[..i].iter().any(|c| same_name(&c.name, &col.name)) {
                        return Err(SchemaError::ColumnAlreadyExists {
                            table: table.clone(),
                            column: col.name.clone(),
                        });
                    }
                }
                self.tables.insert(table.clone(), columns.clone());
            }

            SchemaOp::DropTable { table } => {
                let key = self.require_table(table)?;
                self.tables.remove(&key);
            }

            SchemaOp::RenameTable { from, to } => {
                let key = self.require_table(from)?;
                if self.has_table(to) {
                    return Err(SchemaError::TableAlreadyExists { table: to.clone() });
                }
                if let Some(cols) = self.tables.remove(&key) {
                    self.tables.insert(to.clone(), cols);
                }
            }

            SchemaOp::AddColumn { table, column } => {
                self.require_table(table)?;
                if self.has_column(table, &column.name) {
                    return Err(SchemaError::ColumnAlreadyExists {
                        table: table.clone(),
                        column: column.name.clone(),
                    });
                }
                check_addable(table, column)?;
                if let Some(cols) = self.columns_mut(table) {
                    cols.push(column.clone());
                }
            }

            SchemaOp::DropColumn { table, column } => {
                self.require_column(table, column)?;
                check_droppable(table, column, self.columns(table).unwrap_or_default())?;
                if let Some(cols) = self.columns_mut(table) {
                    cols.retain(|c| !same_name(&c.name, column));
                }
            }

            SchemaOp::AlterColumnType {
                table,
                column,
                new_type,
            } => {
                self.require_column(table, column)?;
                if let Some(col) = self
                    .columns_mut(table)
                    .and_then(|cols| cols.iter_mut().find(|c| same_name(&c.name, column)))
                {
                    col.column_type = *new_type;
                }
            }

            SchemaOp::RenameColumn { table, from, to } => {
                self.require_column(table, from)?;
                if self.has_column(table, to) {
                    return Err(SchemaError::ColumnAlreadyExists {
                        table: table.clone(),
                        column: to.clone(),
                    });
                }
                if let Some(col) = self
                    .columns_mut(table)
                    .and_then(|cols| cols.iter_mut().find(|c| same_name(&c.name, from)))
                {
                    col.name = to.clone();
                }
            }
        }
        Ok(())
    }

    /// Apply a sequence of operations all-or-nothing
    ///
    /// Returns the index of the failing step alongside the error.
    pub fn apply_all(&mut self, ops: &[SchemaOp]) -> Result<(), (usize, SchemaError)> {
        let mut scratch = self.clone();
        for (i, op) in ops.iter().enumerate() {
            scratch.apply(op).map_err(|e| (i, e))?;
        }
        *self = scratch;
        Ok(())
    }

    /// Stored spelling of `table`
    fn table_key(&self, table: &str) -> Option<&String> {
        self.tables.keys().find(|name| same_name(name, table))
    }

    fn columns_mut(&mut self, table: &str) -> Option<&mut Vec<ColumnDef>> {
        self.tables
            .iter_mut()
            .find(|(name, _)| same_name(name, table))
            .map(|(_, cols)| cols)
    }

    fn require_table(&self, table: &str) -> Result<String, SchemaError> {
        self.table_key(table)
            .cloned()
            .ok_or_else(|| SchemaError::TableNotFound {
                table: table.to_string(),
            })
    }

    fn require_column(&self, table: &str, column: &str) -> Result<(), SchemaError> {
        self.require_table(table)?;
        if self.has_column(table, column) {
            Ok(())
        } else {
            Err(SchemaError::ColumnNotFound {
                table: table.to_string(),
                column: column.to_string(),
            })
        }
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// SQLite refuses to drop a primary key column or a table's last column
fn check_droppable(table: &str, column: &str, columns: &[ColumnDef]) -> Result<(), SchemaError> {
    let is_primary_key = columns
        .iter()
        .any(|c| same_name(&c.name, column) && c.primary_key);
    if is_primary_key {
        return Err(SchemaError::InvalidColumn {
            table: table.to_string(),
            column: column.to_string(),
            reason: "cannot drop a primary key column".to_string(),
        });
    }
    if columns.len() <= 1 {
        return Err(SchemaError::EmptyTable {
            table: table.to_string(),
        });
    }
    Ok(())
}

/// Rules for adding a column to an existing table
///
/// Existing rows need a value for the new column, so it may not be a primary
/// key and a NOT NULL column must carry a default.
pub fn check_addable(table: &str, column: &ColumnDef) -> Result<(), SchemaError> {
    let reason = if column.primary_key {
        Some("cannot add a primary key column to an existing table")
    } else if !column.nullable && column.default.is_none() {
        Some("a NOT NULL column added to an existing table needs a default")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(SchemaError::InvalidColumn {
            table: table.to_string(),
            column: column.name.clone(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}
