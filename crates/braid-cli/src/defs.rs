//! Textual definitions for schemas and rows.
//!
//! The CLI takes table shape on the command line, so every definition
//! has a compact one-token grammar:
//! - column: `name:type[:null]`
//! - index:  `name=col[,col…]`
//! - fk:     `name=cols@index->table(cols)@index[;on_delete[;on_update]]`
//! - values parse under the schema's column types; `null` is NULL.

use braid_core::{
    schema::{Column, ColumnType, ForeignKey, IndexSchema, ReferentialAction, TableSchema},
    value::Value,
};

pub fn parse_column(def: &str) -> Result<Column, String> {
    let mut parts = def.split(':');
    let name = parts
        .next()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| format!("column '{def}' is missing a name"))?;
    let ty = match parts.next() {
        Some("bool") => ColumnType::Bool,
        Some("int") => ColumnType::Int,
        Some("uint") => ColumnType::Uint,
        Some("text") => ColumnType::Text,
        Some("bytes") => ColumnType::Bytes,
        Some(other) => return Err(format!("column '{name}' has unknown type '{other}'")),
        None => return Err(format!("column '{name}' is missing a type")),
    };
    let nullable = match parts.next() {
        None | Some("notnull") => false,
        Some("null") => true,
        Some(other) => return Err(format!("column '{name}' has unknown modifier '{other}'")),
    };
    if parts.next().is_some() {
        return Err(format!("column '{def}' has trailing segments"));
    }

    Ok(Column::new(name, ty, nullable))
}

fn split_named(def: &str) -> Result<(&str, &str), String> {
    def.split_once('=')
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| format!("definition '{def}' must look like name=…"))
}

pub fn parse_index(def: &str, unique: bool) -> Result<IndexSchema, String> {
    let (name, columns) = split_named(def)?;
    let columns: Vec<String> = columns
        .split(',')
        .filter(|column| !column.is_empty())
        .map(str::to_string)
        .collect();
    if columns.is_empty() {
        return Err(format!("index '{name}' names no columns"));
    }

    Ok(IndexSchema::new(name, columns, unique))
}

fn parse_action(raw: &str) -> Result<ReferentialAction, String> {
    match raw {
        "restrict" => Ok(ReferentialAction::Restrict),
        "cascade" => Ok(ReferentialAction::Cascade),
        "set_null" | "set-null" => Ok(ReferentialAction::SetNull),
        other => Err(format!("unknown referential action '{other}'")),
    }
}

fn parse_columns_at_index(raw: &str, what: &str) -> Result<(Vec<String>, String), String> {
    let (columns, index) = raw
        .split_once('@')
        .ok_or_else(|| format!("{what} '{raw}' must look like cols@index"))?;
    let columns: Vec<String> = columns
        .split(',')
        .filter(|column| !column.is_empty())
        .map(str::to_string)
        .collect();
    if columns.is_empty() {
        return Err(format!("{what} '{raw}' names no columns"));
    }
    Ok((columns, index.to_string()))
}

pub fn parse_fk(child_table: &str, def: &str) -> Result<ForeignKey, String> {
    let (name, rest) = split_named(def)?;
    let mut action_parts = rest.split(';');
    let endpoints = action_parts
        .next()
        .ok_or_else(|| format!("foreign key '{name}' is missing endpoints"))?;
    let on_delete = action_parts.next().map(parse_action).transpose()?;
    let on_update = action_parts.next().map(parse_action).transpose()?;

    let (referring, referenced) = endpoints
        .split_once("->")
        .ok_or_else(|| format!("foreign key '{name}' must look like cols@index->table(cols)@index"))?;
    let (columns, index) = parse_columns_at_index(referring, "referring side")?;

    let (referenced_table, referenced_rest) = referenced
        .split_once('(')
        .ok_or_else(|| format!("foreign key '{name}' is missing the referenced table"))?;
    let (referenced_columns_raw, referenced_index) = referenced_rest
        .split_once(')')
        .ok_or_else(|| format!("foreign key '{name}' has an unclosed column list"))?;
    let referenced_index = referenced_index
        .strip_prefix('@')
        .ok_or_else(|| format!("foreign key '{name}' is missing the referenced index"))?;
    let referenced_columns: Vec<String> = referenced_columns_raw
        .split(',')
        .filter(|column| !column.is_empty())
        .map(str::to_string)
        .collect();

    Ok(ForeignKey::new(
        name,
        child_table,
        columns,
        index,
        referenced_table,
        referenced_columns,
        referenced_index,
        on_delete.unwrap_or_default(),
        on_update.unwrap_or_default(),
    ))
}

pub fn parse_value(ty: ColumnType, raw: &str) -> Result<Value, String> {
    if raw == "null" {
        return Ok(Value::Null);
    }

    match ty {
        ColumnType::Bool => match raw {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            other => Err(format!("'{other}' is not a bool")),
        },
        ColumnType::Int => raw
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| format!("'{raw}' is not an int")),
        ColumnType::Uint => raw
            .parse::<u64>()
            .map(Value::Uint)
            .map_err(|_| format!("'{raw}' is not a uint")),
        ColumnType::Text => Ok(Value::Text(raw.to_string())),
        ColumnType::Bytes => parse_hex(raw).map(Value::Bytes),
    }
}

fn parse_hex(raw: &str) -> Result<Vec<u8>, String> {
    if raw.len() % 2 != 0 {
        return Err(format!("'{raw}' is not even-length hex"));
    }
    (0..raw.len())
        .step_by(2)
        .map(|at| {
            u8::from_str_radix(&raw[at..at + 2], 16)
                .map_err(|_| format!("'{raw}' is not valid hex"))
        })
        .collect()
}

/// Parse one full row under the schema's column layout.
pub fn parse_row(schema: &TableSchema, raw: &[String]) -> Result<Vec<Value>, String> {
    if raw.len() != schema.columns().len() {
        return Err(format!(
            "table '{}' expects {} values, got {}",
            schema.name(),
            schema.columns().len(),
            raw.len()
        ));
    }

    schema
        .columns()
        .iter()
        .zip(raw)
        .map(|(column, value)| {
            parse_value(column.ty, value)
                .map_err(|err| format!("column '{}': {err}", column.name))
        })
        .collect()
}

/// Parse primary-key values (the full tuple for keyless tables).
pub fn parse_key_values(schema: &TableSchema, raw: &[String]) -> Result<Vec<Value>, String> {
    if schema.is_keyless() {
        return parse_row(schema, raw);
    }

    let key_columns: Vec<&Column> = schema
        .primary_key()
        .iter()
        .filter_map(|name| schema.column(name))
        .collect();
    if raw.len() != key_columns.len() {
        return Err(format!(
            "table '{}' has a {}-column key, got {} values",
            schema.name(),
            key_columns.len(),
            raw.len()
        ));
    }

    key_columns
        .iter()
        .zip(raw)
        .map(|(column, value)| {
            parse_value(column.ty, value)
                .map_err(|err| format!("key column '{}': {err}", column.name))
        })
        .collect()
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_parse_with_optional_nullability() {
        let column = parse_column("v1:int:null").unwrap();
        assert_eq!(column.name, "v1");
        assert!(column.nullable);

        let column = parse_column("pk:uint").unwrap();
        assert!(!column.nullable);

        assert!(parse_column("pk").is_err());
        assert!(parse_column("pk:float").is_err());
    }

    #[test]
    fn fk_definitions_round_trip_the_grammar() {
        let fk = parse_fk("child", "fk_cp=v1@v1->parent(v1)@v1;cascade;set_null").unwrap();
        assert_eq!(fk.name(), "fk_cp");
        assert_eq!(fk.table(), "child");
        assert_eq!(fk.referenced_table(), "parent");
        assert_eq!(fk.on_delete(), ReferentialAction::Cascade);
        assert_eq!(fk.on_update(), ReferentialAction::SetNull);

        // Actions default to RESTRICT.
        let fk = parse_fk("child", "fk=v1@v1->parent(v1)@PRIMARY").unwrap();
        assert_eq!(fk.on_delete(), ReferentialAction::Restrict);
        assert_eq!(fk.referenced_index(), "PRIMARY");
    }

    #[test]
    fn values_parse_under_column_types() {
        assert_eq!(parse_value(ColumnType::Int, "-3").unwrap(), Value::Int(-3));
        assert_eq!(parse_value(ColumnType::Uint, "7").unwrap(), Value::Uint(7));
        assert_eq!(parse_value(ColumnType::Int, "null").unwrap(), Value::Null);
        assert_eq!(
            parse_value(ColumnType::Bytes, "0aff").unwrap(),
            Value::Bytes(vec![0x0a, 0xff])
        );
        assert!(parse_value(ColumnType::Uint, "-1").is_err());
    }
}
