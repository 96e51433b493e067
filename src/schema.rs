//! Positional schema mapping and projection.
//!
//! The dump carries no column names in its INSERT statements, so rows are
//! mapped positionally onto an ordered schema. The schema is data, not
//! code: [`TableSchema::entries`] bundles the standard 16-column `entries`
//! layout, but an alternate dump layout can be substituted without
//! touching the parser.

use crate::error::ParseError;
use crate::tokenize::FieldValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Str,
    Int64,
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

impl Column {
    pub fn new(name: &str, ty: ColumnType) -> Self {
        Column {
            name: name.to_string(),
            ty,
        }
    }
}

/// An ordered list of named, typed columns.
#[derive(Debug, Clone)]
pub struct TableSchema {
    columns: Vec<Column>,
}

impl TableSchema {
    pub fn new(columns: Vec<Column>) -> Self {
        TableSchema { columns }
    }

    /// The standard `entries` table layout: one row per inode.
    pub fn entries() -> Self {
        use ColumnType::{Int64, Str};
        TableSchema::new(vec![
            Column::new("id", Str),
            Column::new("uid", Int64),
            Column::new("gid", Int64),
            Column::new("size", Int64),
            Column::new("blocks", Int64),
            Column::new("creation_time", Int64),
            Column::new("last_access", Int64),
            Column::new("last_mod", Int64),
            Column::new("last_mdchange", Int64),
            Column::new("type", Str),
            Column::new("mode", Int64),
            Column::new("nlink", Int64),
            Column::new("md_update", Int64),
            Column::new("invalid", Int64),
            Column::new("fileclass", Str),
            Column::new("class_update", Str),
        ])
    }

    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// One coerced scalar value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarValue {
    Text(String),
    Int(i64),
}

/// One fully coerced row, aligned with its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    pub values: Vec<ScalarValue>,
}

/// The two columns the histogram pipeline actually needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeTypePair {
    pub inode_type: String,
    pub size: i64,
}

/// Coerce a row group positionally onto `schema`.
///
/// NULL coerces to a type-appropriate absence marker (zero for integers,
/// the empty string for strings) rather than failing. Non-numeric content
/// in a numeric column fails just this record. A group with the wrong
/// arity is rejected outright; truncating or padding it would silently
/// misalign every later column.
pub fn coerce_row(schema: &TableSchema, tokens: Vec<FieldValue>) -> Result<EntryRecord, ParseError> {
    if tokens.len() != schema.arity() {
        return Err(ParseError::RowShape {
            expected: schema.arity(),
            got: tokens.len(),
        });
    }
    let mut values = Vec::with_capacity(tokens.len());
    for (column, token) in schema.columns().iter().zip(tokens) {
        let value = match (column.ty, token) {
            (ColumnType::Str, FieldValue::Text(s)) => ScalarValue::Text(s),
            (ColumnType::Str, FieldValue::Null) => ScalarValue::Text(String::new()),
            (ColumnType::Int64, FieldValue::Null) => ScalarValue::Int(0),
            (ColumnType::Int64, FieldValue::Text(s)) => match s.trim().parse::<i64>() {
                Ok(n) => ScalarValue::Int(n),
                Err(_) => {
                    return Err(ParseError::FieldCoercion {
                        column: column.name.clone(),
                        value: s,
                    })
                }
            },
        };
        values.push(value);
    }
    Ok(EntryRecord { values })
}

/// Column indices for the histogram projection, resolved against a schema
/// once up front.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    type_idx: usize,
    size_idx: usize,
}

impl Projection {
    /// Resolve the `type` and `size` columns. A schema without them cannot
    /// feed the histogram at all, so this is a structural error.
    pub fn for_schema(schema: &TableSchema) -> anyhow::Result<Self> {
        let type_idx = schema
            .column_index("type")
            .ok_or_else(|| anyhow::anyhow!("schema has no 'type' column"))?;
        let size_idx = schema
            .column_index("size")
            .ok_or_else(|| anyhow::anyhow!("schema has no 'size' column"))?;
        Ok(Projection { type_idx, size_idx })
    }

    pub fn project(&self, record: &EntryRecord) -> SizeTypePair {
        let inode_type = match &record.values[self.type_idx] {
            ScalarValue::Text(s) => s.clone(),
            ScalarValue::Int(n) => n.to_string(),
        };
        let size = match &record.values[self.size_idx] {
            ScalarValue::Int(n) => *n,
            // Unreachable with the bundled schema; a substituted schema
            // could type `size` as a string, in which case it has already
            // failed coercion if non-numeric.
            ScalarValue::Text(s) => s.parse().unwrap_or(0),
        };
        SizeTypePair { inode_type, size }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries_row(size: &str, inode_type: &str) -> Vec<FieldValue> {
        let mut row = vec![FieldValue::Text("inode-1".to_string())];
        row.push(FieldValue::Text("100".to_string())); // uid
        row.push(FieldValue::Text("100".to_string())); // gid
        row.push(FieldValue::Text(size.to_string()));
        for _ in 0..5 {
            row.push(FieldValue::Text("0".to_string()));
        }
        row.push(FieldValue::Text(inode_type.to_string()));
        for _ in 0..4 {
            row.push(FieldValue::Text("0".to_string()));
        }
        row.push(FieldValue::Text("a".to_string()));
        row.push(FieldValue::Text("b".to_string()));
        row
    }

    #[test]
    fn test_entries_schema_shape() {
        let schema = TableSchema::entries();
        assert_eq!(schema.arity(), 16);
        assert_eq!(schema.column_index("size"), Some(3));
        assert_eq!(schema.column_index("type"), Some(9));
        assert_eq!(schema.column_index("nonesuch"), None);
    }

    #[test]
    fn test_coerce_and_project() {
        let schema = TableSchema::entries();
        let projection = Projection::for_schema(&schema).unwrap();
        let record = coerce_row(&schema, entries_row("4096", "dir")).unwrap();
        let pair = projection.project(&record);
        assert_eq!(pair.inode_type, "dir");
        assert_eq!(pair.size, 4096);
    }

    #[test]
    fn test_null_coerces_to_absence_markers() {
        let schema = TableSchema::entries();
        let mut row = entries_row("1", "file");
        row[3] = FieldValue::Null; // size
        row[15] = FieldValue::Null; // class_update
        let record = coerce_row(&schema, row).unwrap();
        assert_eq!(record.values[3], ScalarValue::Int(0));
        assert_eq!(record.values[15], ScalarValue::Text(String::new()));
    }

    #[test]
    fn test_non_numeric_field_fails_only_the_record() {
        let schema = TableSchema::entries();
        let mut row = entries_row("1", "file");
        row[1] = FieldValue::Text("banana".to_string()); // uid
        let err = coerce_row(&schema, row).unwrap_err();
        assert_eq!(
            err,
            ParseError::FieldCoercion {
                column: "uid".to_string(),
                value: "banana".to_string()
            }
        );
    }

    #[test]
    fn test_wrong_arity_rejected() {
        let schema = TableSchema::entries();
        let mut row = entries_row("1", "file");
        row.pop();
        let err = coerce_row(&schema, row).unwrap_err();
        assert!(matches!(err, ParseError::RowShape { expected: 16, got: 15 }));
    }
}
