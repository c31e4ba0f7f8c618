//! Input validation and attribute parsing shared by the derive.

use syn::punctuated::Punctuated;
use syn::token::Comma;
use syn::{Attribute, Data, DeriveInput, Field, Fields, Ident, LitStr, Visibility};

/// Validate that the input is a non-generic struct with named fields,
/// returning the fields.
pub fn validate_record(input: &DeriveInput) -> syn::Result<&Punctuated<Field, Comma>> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Persist derive does not support generic structs",
        ));
    }
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(&fields.named),
            _ => Err(syn::Error::new_spanned(
                input,
                "Persist derive only supports structs with named fields",
            )),
        },
        _ => Err(syn::Error::new_spanned(
            input,
            "Persist derive only supports structs",
        )),
    }
}

/// Whether the field is visible outside its crate.
pub fn is_public(field: &Field) -> bool {
    matches!(field.vis, Visibility::Public(_))
}

/// Whether the field carries `#[parcel(skip)]`.
pub fn is_skipped(field: &Field) -> syn::Result<bool> {
    let mut skip = false;
    for attr in parcel_attrs(&field.attrs) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                Err(meta.error("unknown field attribute; expected `skip`"))
            }
        })?;
    }
    Ok(skip)
}

/// Hook methods named by the container attributes.
#[derive(Default)]
pub struct Hooks {
    pub post_construct: Option<Ident>,
    pub post_load: Option<Ident>,
}

/// Parse `#[parcel(post_construct = "...", post_load = "...")]`.
pub fn parse_hooks(input: &DeriveInput) -> syn::Result<Hooks> {
    let mut hooks = Hooks::default();
    for attr in parcel_attrs(&input.attrs) {
        attr.parse_nested_meta(|meta| {
            let slot = if meta.path.is_ident("post_construct") {
                &mut hooks.post_construct
            } else if meta.path.is_ident("post_load") {
                &mut hooks.post_load
            } else {
                return Err(meta.error(
                    "unknown container attribute; expected `post_construct` or `post_load`",
                ));
            };
            if slot.is_some() {
                return Err(meta.error("hook given more than once"));
            }
            let method: LitStr = meta.value()?.parse()?;
            *slot = Some(method.parse()?);
            Ok(())
        })?;
    }
    Ok(hooks)
}

fn parcel_attrs(attrs: &[Attribute]) -> impl Iterator<Item = &Attribute> {
    attrs.iter().filter(|attr| attr.path().is_ident("parcel"))
}
