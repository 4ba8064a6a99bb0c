//! DBX Derive: procedural macros for DBX Proxy.
//!
//! Provides `#[derive(Table)]` for typed rows.

use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, parse_macro_input};

/// Derive macro for typed table rows.
///
/// # Example
///
/// ```ignore
/// #[derive(Table)]
/// #[dbx(table_name = "user")]
/// pub struct User {
///     pub id: i64,
///     pub username: String,
///     #[dbx(column = "is_admin")]
///     pub admin: Option<i64>,
///     #[dbx(skip)]
///     pub cached_label: String,
/// }
/// ```
///
/// Generates:
/// - `TableSchema`: `TABLE_NAME`, `columns()` (every field except `id` and skipped ones)
/// - `FromRecord`: reads each field with `Record::get_as`; skipped fields use `Default`
#[proc_macro_derive(Table, attributes(dbx))]
pub fn derive_table(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

struct FieldSpec<'a> {
    ident: &'a syn::Ident,
    ty: &'a syn::Type,
    column: String,
    skip: bool,
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let table_name =
        extract_table_name(input)?.unwrap_or_else(|| name.to_string().to_lowercase());

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Table can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Table can only be derived for structs",
            ));
        }
    };

    let specs = fields
        .iter()
        .map(field_spec)
        .collect::<syn::Result<Vec<_>>>()?;

    // id is implicit in every table
    let columns = specs
        .iter()
        .filter(|f| !f.skip && f.column != "id")
        .map(|f| f.column.as_str());

    let from_record_fields = specs.iter().map(|f| {
        let ident = f.ident;
        let ty = f.ty;
        let column = &f.column;
        if f.skip {
            quote! { #ident: ::core::default::Default::default() }
        } else {
            quote! { #ident: record.get_as::<#ty>(#column)? }
        }
    });

    Ok(quote! {
        impl ::dbx_proxy::TableSchema for #name {
            const TABLE_NAME: &'static str = #table_name;

            fn columns() -> ::std::vec::Vec<&'static str> {
                ::std::vec![#(#columns),*]
            }
        }

        impl ::dbx_proxy::FromRecord for #name {
            fn from_record(record: &::dbx_proxy::Record) -> ::dbx_proxy::DbxResult<Self> {
                ::core::result::Result::Ok(Self {
                    #(#from_record_fields),*
                })
            }
        }
    })
}

fn field_spec(field: &syn::Field) -> syn::Result<FieldSpec<'_>> {
    let ident = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
    let mut spec = FieldSpec {
        ident,
        ty: &field.ty,
        column: ident.to_string(),
        skip: false,
    };

    for attr in field.attrs.iter().filter(|a| a.path().is_ident("dbx")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                spec.skip = true;
                Ok(())
            } else if meta.path.is_ident("column") {
                spec.column = meta.value()?.parse::<LitStr>()?.value();
                Ok(())
            } else {
                Err(meta.error("unsupported dbx field attribute"))
            }
        })?;
    }
    Ok(spec)
}

fn extract_table_name(input: &DeriveInput) -> syn::Result<Option<String>> {
    let mut table_name = None;
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("dbx")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table_name") {
                table_name = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else {
                Err(meta.error("unsupported dbx attribute"))
            }
        })?;
    }
    Ok(table_name)
}
