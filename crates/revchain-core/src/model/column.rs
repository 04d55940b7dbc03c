use serde::{Deserialize, Serialize};

/// Portable column type vocabulary
///
/// Backends map each variant onto a concrete declared type; `sql_name` is the
/// spelling written into DDL and `from_declared` reads it back during
/// introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Blob,
    Boolean,
    Timestamp,
    Json,
}

impl ColumnType {
    /// Declared type name used in DDL
    pub fn sql_name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Blob => "BLOB",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Json => "JSON",
        }
    }

    /// Parse a declared type back into the vocabulary (case-insensitive)
    pub fn from_declared(declared: &str) -> Option<Self> {
        match declared.trim().to_ascii_uppercase().as_str() {
            "INTEGER" | "INT" | "BIGINT" => Some(ColumnType::Integer),
            "REAL" | "FLOAT" | "DOUBLE" => Some(ColumnType::Real),
            "TEXT" | "VARCHAR" => Some(ColumnType::Text),
            "BLOB" => Some(ColumnType::Blob),
            "BOOLEAN" | "BOOL" => Some(ColumnType::Boolean),
            "TIMESTAMP" | "DATETIME" => Some(ColumnType::Timestamp),
            "JSON" => Some(ColumnType::Json),
            _ => None,
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.sql_name())
    }
}

fn default_nullable() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Definition of a single column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,

    #[serde(rename = "type")]
    pub column_type: ColumnType,

    #[serde(default = "default_nullable", skip_serializing_if = "is_true")]
    pub nullable: bool,

    /// Default value as SQL literal text (e.g. `0`, `'pending'`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub primary_key: bool,
}

impl ColumnDef {
    /// Nullable column with no default
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            default: None,
            primary_key: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Mark as primary key; primary keys are never nullable
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_type_round_trip() {
        for ty in [
            ColumnType::Integer,
            ColumnType::Real,
            ColumnType::Text,
            ColumnType::Blob,
            ColumnType::Boolean,
            ColumnType::Timestamp,
            ColumnType::Json,
        ] {
            assert_eq!(ColumnType::from_declared(ty.sql_name()), Some(ty));
        }
    }

    #[test]
    fn test_declared_type_aliases() {
        assert_eq!(ColumnType::from_declared("varchar"), Some(ColumnType::Text));
        assert_eq!(ColumnType::from_declared(" bool "), Some(ColumnType::Boolean));
        assert_eq!(ColumnType::from_declared("GEOMETRY"), None);
    }

    #[test]
    fn test_column_defaults_from_json() {
        let col: ColumnDef =
            serde_json::from_str(r#"{"name": "tool_metadata", "type": "json"}"#).unwrap();
        assert_eq!(col, ColumnDef::new("tool_metadata", ColumnType::Json));
        assert!(col.nullable);
    }

    #[test]
    fn test_primary_key_implies_not_null() {
        let col = ColumnDef::new("id", ColumnType::Integer).primary_key();
        assert!(col.primary_key);
        assert!(!col.nullable);
    }
}
