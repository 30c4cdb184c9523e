//! `#[derive(Entity)]` for repository entities
//!
//! Generates the `repo_object::Entity` implementation from the struct
//! definition: the table name, the key field and type, and the column list.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

mod parsing;

use parsing::parse_entity;

/// Derive macro for the `Entity` trait
///
/// ```rust,ignore
/// #[derive(Debug, Clone, Serialize, Deserialize, Entity)]
/// #[entity(table = "users")]
/// pub struct User {
///     #[key]
///     pub id: i64,
///     pub name: String,
///     pub age: i32,
/// }
/// ```
///
/// Column names are the field names; the struct must serialize to a JSON
/// object with the same keys, so avoid `#[serde(rename)]` on entity fields.
#[proc_macro_derive(Entity, attributes(entity, key))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let info = match parse_entity(&input) {
        Ok(info) => info,
        Err(e) => return e.to_compile_error().into(),
    };

    #[cfg(feature = "debug-logging")]
    eprintln!(
        "[entity-derive] {} -> table '{}', key '{}', {} columns",
        input.ident,
        info.table,
        info.key_ident,
        info.columns.len()
    );

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let table = &info.table;
    let key_ident = &info.key_ident;
    let key_type = &info.key_type;
    let key_field = syn::ext::IdentExt::unraw(key_ident).to_string();
    let columns = &info.columns;

    let expanded = quote! {
        impl #impl_generics repo_object::Entity for #name #ty_generics #where_clause {
            type Key = #key_type;

            fn table_name() -> &'static str {
                #table
            }

            fn key_field() -> &'static str {
                #key_field
            }

            fn key(&self) -> Self::Key {
                ::std::clone::Clone::clone(&self.#key_ident)
            }

            fn columns() -> &'static [&'static str] {
                &[#(#columns),*]
            }
        }
    };

    TokenStream::from(expanded)
}
