//! Parsing of `#[entity]` and `#[key]` attributes
//!
//! Names are validated here with the same rules the runtime applies, so an
//! unusable table or column name fails the build instead of the first query.

use proc_macro2::Span;
use syn::ext::IdentExt;
use syn::{Attribute, Data, DeriveInput, Error, Fields, Ident, LitStr, Result, Type};

/// Words PostgreSQL reserves outright; kept in step with `repo_object::validation`
const RESERVED_KEYWORDS: &[&str] = &[
    "ALL", "ANALYSE", "ANALYZE", "AND", "ANY", "ARRAY", "AS", "ASC", "ASYMMETRIC", "BOTH",
    "CASE", "CAST", "CHECK", "COLLATE", "COLUMN", "CONSTRAINT", "CREATE", "CURRENT_DATE",
    "CURRENT_ROLE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER", "DEFAULT",
    "DEFERRABLE", "DELETE", "DESC", "DISTINCT", "DO", "DROP", "ELSE", "END", "EXCEPT", "FALSE",
    "FETCH", "FOR", "FOREIGN", "FROM", "GRANT", "GROUP", "HAVING", "IN", "INITIALLY", "INSERT",
    "INTERSECT", "INTO", "LATERAL", "LEADING", "LIMIT", "LOCALTIME", "LOCALTIMESTAMP", "NOT",
    "NULL", "OFFSET", "ON", "ONLY", "OR", "ORDER", "PLACING", "PRIMARY", "REFERENCES",
    "RETURNING", "SELECT", "SESSION_USER", "SOME", "SYMMETRIC", "TABLE", "THEN", "TO",
    "TRAILING", "TRUE", "UNION", "UNIQUE", "UPDATE", "USER", "USING", "VARIADIC", "WHEN",
    "WHERE", "WINDOW", "WITH",
];

pub fn validate_table_name_syn(name: &str, span: Span) -> Result<()> {
    validate_identifier(name)
        .map_err(|e| Error::new(span, format!("Invalid table name '{}': {}", name, e)))
}

pub fn validate_field_name_syn(name: &str, span: Span) -> Result<()> {
    validate_identifier(name)
        .map_err(|e| Error::new(span, format!("Invalid field name '{}': {}", name, e)))
}

fn validate_identifier(name: &str) -> std::result::Result<(), String> {
    let first_char = name
        .chars()
        .next()
        .ok_or_else(|| "Name cannot be empty".to_string())?;

    if name.len() > 63 {
        return Err(format!("{} characters (max 63)", name.len()));
    }

    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err("must start with a letter or underscore".to_string());
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err("only alphanumeric characters and underscores are allowed".to_string());
    }

    if RESERVED_KEYWORDS.contains(&name.to_ascii_uppercase().as_str()) {
        return Err("reserved SQL keyword".to_string());
    }

    Ok(())
}

/// Everything the derive needs to know about one entity struct
#[derive(Debug)]
pub struct EntityInfo {
    pub table: String,
    pub key_ident: Ident,
    pub key_type: Type,
    pub columns: Vec<String>,
}

/// Table name from `#[entity(table = "...")]`
pub fn parse_entity_attributes(attrs: &[Attribute]) -> Result<String> {
    let mut table: Option<LitStr> = None;

    for attr in attrs.iter().filter(|a| a.path().is_ident("entity")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                table = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("unsupported entity attribute, expected `table = \"...\"`"))
            }
        })?;
    }

    let table = table.ok_or_else(|| {
        Error::new(
            Span::call_site(),
            "entity attribute is required: add #[entity(table = \"table_name\")] to your struct",
        )
    })?;

    validate_table_name_syn(&table.value(), table.span())?;
    Ok(table.value())
}

pub fn parse_entity(input: &DeriveInput) -> Result<EntityInfo> {
    let table = parse_entity_attributes(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(Error::new_spanned(
                    &input.ident,
                    "Entity can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new_spanned(
                &input.ident,
                "Entity can only be derived for structs",
            ))
        }
    };

    let mut key: Option<(Ident, Type)> = None;
    let mut columns = Vec::with_capacity(fields.len());

    for field in fields {
        let Some(ident) = &field.ident else {
            continue;
        };
        let column = ident.unraw().to_string();
        validate_field_name_syn(&column, ident.span())?;

        if field.attrs.iter().any(|a| a.path().is_ident("key")) {
            if key.is_some() {
                return Err(Error::new_spanned(
                    ident,
                    "only one field can be marked #[key]",
                ));
            }
            key = Some((ident.clone(), field.ty.clone()));
        }

        columns.push(column);
    }

    let (key_ident, key_type) = key.ok_or_else(|| {
        Error::new_spanned(
            &input.ident,
            "missing key: mark exactly one field with #[key]",
        )
    })?;

    Ok(EntityInfo {
        table,
        key_ident,
        key_type,
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_parse_entity() {
        let input: DeriveInput = parse_quote! {
            #[entity(table = "users")]
            struct User {
                #[key]
                id: i64,
                name: String,
                r#type: String,
            }
        };

        let info = parse_entity(&input).unwrap();
        assert_eq!(info.table, "users");
        assert_eq!(info.key_ident.to_string(), "id");
        assert_eq!(info.columns, vec!["id", "name", "type"]);
    }

    #[test]
    fn test_rejects_bad_declarations() {
        let missing_table: DeriveInput = parse_quote! {
            struct User { #[key] id: i64 }
        };
        assert!(parse_entity(&missing_table).is_err());

        let missing_key: DeriveInput = parse_quote! {
            #[entity(table = "users")]
            struct User { id: i64 }
        };
        assert!(parse_entity(&missing_key).is_err());

        let two_keys: DeriveInput = parse_quote! {
            #[entity(table = "users")]
            struct User { #[key] id: i64, #[key] other: i64 }
        };
        assert!(parse_entity(&two_keys).is_err());

        let reserved_table: DeriveInput = parse_quote! {
            #[entity(table = "select")]
            struct User { #[key] id: i64 }
        };
        assert!(parse_entity(&reserved_table).is_err());

        let reserved_column: DeriveInput = parse_quote! {
            #[entity(table = "users")]
            struct User { #[key] id: i64, order: i32 }
        };
        assert!(parse_entity(&reserved_column).is_err());

        let tuple: DeriveInput = parse_quote! {
            #[entity(table = "users")]
            struct User(i64);
        };
        assert!(parse_entity(&tuple).is_err());
    }
}
