//! Persist derive implementation.
//!
//! Generates `::parcel::Record` and `::parcel::Persist` implementations.
//! Paths are absolute, so the `parcel` crate must be reachable under that
//! name.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::{parse_macro_input, DeriveInput, Ident};

use crate::utils::{is_public, is_skipped, parse_hooks, validate_record};

/// Main entry point for the Persist derive macro.
pub fn derive_persist(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

pub(crate) fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let fields = validate_record(input)?;
    let hooks = parse_hooks(input)?;

    let mut idents: Vec<&Ident> = Vec::new();
    for field in fields {
        if !is_public(field) || is_skipped(field)? {
            continue;
        }
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected named field"))?;
        idents.push(ident);
    }
    let wire_names: Vec<String> = idents.iter().map(|i| i.unraw().to_string()).collect();

    let post_construct = hooks.post_construct.map(|method| {
        quote! {
            fn post_construct(&mut self) {
                self.#method();
            }
        }
    });
    let post_load = hooks.post_load.map(|method| {
        quote! {
            fn post_load(&mut self) {
                self.#method();
            }
        }
    });

    Ok(quote! {
        impl ::parcel::Record for #name {
            const FIELDS: &'static [&'static str] = &[#(#wire_names),*];

            fn encode_fields<__M: ::parcel::__private::SerializeMap>(
                &self,
                __enc: &::parcel::Encoder<'_>,
                __map: &mut __M,
            ) -> ::core::result::Result<(), __M::Error> {
                #(::parcel::codec::write_field(__enc, __map, #wire_names, &self.#idents)?;)*
                ::core::result::Result::Ok(())
            }

            fn decode_field<'__de, __A: ::parcel::__private::MapAccess<'__de>>(
                &mut self,
                __name: &str,
                __dec: &mut ::parcel::Decoder<'_>,
                __map: &mut __A,
            ) -> ::core::result::Result<bool, __A::Error> {
                match __name {
                    #(#wire_names => {
                        ::parcel::codec::read_field(__dec, __map, &mut self.#idents)?;
                        ::core::result::Result::Ok(true)
                    })*
                    _ => ::core::result::Result::Ok(false),
                }
            }
        }

        impl ::parcel::Persist for #name {
            const SHAPE: ::parcel::Shape = ::parcel::Shape::Record;

            fn encode<__S: ::parcel::__private::Serializer>(
                &self,
                __enc: &::parcel::Encoder<'_>,
                __serializer: __S,
            ) -> ::core::result::Result<__S::Ok, __S::Error> {
                ::parcel::codec::encode_record(self, __enc, __serializer)
            }

            fn decode<'__de, __D: ::parcel::__private::Deserializer<'__de>>(
                &mut self,
                __dec: &mut ::parcel::Decoder<'_>,
                __deserializer: __D,
            ) -> ::core::result::Result<(), __D::Error> {
                ::parcel::codec::decode_record(self, __dec, __deserializer)
            }

            #post_construct
            #post_load
        }
    })
}
