// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::{format_ident, quote};
use std::collections::BTreeMap;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitInt, LitStr};

/// Field after attribute parsing.
struct FieldInfo {
    name: syn::Ident,
    ty: syn::Type,
    /// `None` for `#[wire(skip)]` fields.
    id: Option<u32>,
}

/// Struct-level `#[wire(..)]` options.
#[derive(Default)]
struct StructOptions {
    name: Option<LitStr>,
    well_known_id: Option<u32>,
}

/// `#[derive(Serializable)]` macro: generates a codec/copier pair and the
/// `Serializable` impl for a struct with named fields.
///
/// Every field is written as one field of a tag-delimited object, in field
/// id order. Readers skip ids they do not know and leave missing ones at
/// `Default`, so every field type must implement `Default`.
///
/// Attributes:
/// - `#[wire(id = N)]` on a field: stable field id (default: 1-based
///   declaration position).
/// - `#[wire(skip)]` on a field: never written, `Default` on read and copy.
/// - `#[wire(name = "...")]` on the struct: wire type name (default: the
///   module path plus the struct name).
/// - `#[wire(id = N)]` on the struct: well-known numeric type id, which must
///   be at least `graphwire::FIRST_USER_WELL_KNOWN_ID`.
///
/// Example:
/// ```ignore
/// use graphwire::Serializable;
///
/// #[derive(Serializable, Default)]
/// #[wire(name = "demo.Order")]
/// struct Order {
///     #[wire(id = 1)]
///     symbol: String,
///     #[wire(id = 2)]
///     quantity: u32,
///     #[wire(skip)]
///     cached_total: f64,
/// }
/// ```
#[proc_macro_derive(Serializable, attributes(wire))]
pub fn derive_serializable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(error) => error.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let vis = &input.vis;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "generic structs are not supported; implement Serializable by hand",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(f) => &f.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Only named fields are supported",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(input, "Only structs are supported")),
    };

    let options = parse_struct_options(input)?;

    let mut field_infos = Vec::new();
    let mut taken: BTreeMap<u32, syn::Ident> = BTreeMap::new();
    for (index, field) in fields.iter().enumerate() {
        let Some(field_name) = field.ident.clone() else {
            return Err(syn::Error::new_spanned(field, "Field must have a name"));
        };
        let position = u32::try_from(index + 1).map_err(|_| {
            syn::Error::new_spanned(&field_name, "Struct has too many fields")
        })?;
        let id = parse_field_id(field, position)?;
        if let Some(id) = id {
            if let Some(previous) = taken.insert(id, field_name.clone()) {
                return Err(syn::Error::new_spanned(
                    &field_name,
                    format!("field id {id} is already used by `{previous}`"),
                ));
            }
        }
        field_infos.push(FieldInfo {
            name: field_name,
            ty: field.ty.clone(),
            id,
        });
    }

    let codec = format_ident!("__{}GraphwireCodec", name);
    let codec_name = LitStr::new(&codec.to_string(), Span::call_site());

    // Written in id order, each as a delta from the previous id.
    let mut wired: Vec<&FieldInfo> = field_infos.iter().filter(|f| f.id.is_some()).collect();
    wired.sort_by_key(|f| f.id);
    let mut previous = 0u32;
    let write_fields: Vec<_> = wired
        .iter()
        .map(|f| {
            let id = f.id.unwrap_or_default();
            let delta = id - previous;
            previous = id;
            let field_name = &f.name;
            quote! {
                writer.write_value(#delta, &value.#field_name)?;
            }
        })
        .collect();

    let locals: Vec<_> = field_infos
        .iter()
        .map(|f| format_ident!("__field_{}", f.name))
        .collect();

    let declare_locals: Vec<_> = field_infos
        .iter()
        .zip(&locals)
        .map(|(f, local)| {
            let ty = &f.ty;
            if f.id.is_some() {
                quote! { let mut #local: #ty = ::core::default::Default::default(); }
            } else {
                quote! { let #local: #ty = ::core::default::Default::default(); }
            }
        })
        .collect();

    let read_arms: Vec<_> = field_infos
        .iter()
        .zip(&locals)
        .filter_map(|(f, local)| {
            let id = f.id?;
            let ty = &f.ty;
            Some(quote! {
                #id => #local = reader.read_value::<#ty>(field)?,
            })
        })
        .collect();

    let field_names: Vec<_> = field_infos.iter().map(|f| &f.name).collect();

    let copy_fields: Vec<_> = field_infos
        .iter()
        .map(|f| {
            let field_name = &f.name;
            if f.id.is_some() {
                quote! { #field_name: context.copy(&value.#field_name)? }
            } else {
                quote! { #field_name: ::core::default::Default::default() }
            }
        })
        .collect();

    let wire_name = match &options.name {
        Some(lit) => quote! { #lit },
        None => {
            let plain = LitStr::new(&name.to_string(), Span::call_site());
            quote! { ::core::concat!(::core::module_path!(), "::", #plain) }
        }
    };
    let well_known_id = match options.well_known_id {
        Some(id) => quote! { ::core::option::Option::Some(#id) },
        None => quote! { ::core::option::Option::None },
    };
    // Checked against the library constant when the expansion compiles.
    let reserved_id_check = options.well_known_id.map(|id| {
        quote! {
            const _: () = ::core::assert!(
                #id >= ::graphwire::FIRST_USER_WELL_KNOWN_ID,
                "well-known ids below FIRST_USER_WELL_KNOWN_ID are reserved for built-in types"
            );
        }
    });

    Ok(quote! {
        #[doc(hidden)]
        #[derive(Debug, Default, Clone, Copy)]
        #vis struct #codec;

        impl ::graphwire::FieldCodec<#name> for #codec {
            fn write_field(
                &self,
                writer: &mut ::graphwire::Writer<'_>,
                field_id_delta: u32,
                expected: ::graphwire::TypeKey,
                value: &#name,
            ) -> ::graphwire::Result<()> {
                writer.session_mut().mark_value_field();
                writer.write_field_header(
                    field_id_delta,
                    expected,
                    ::graphwire::TypeKey::of::<#name>(),
                    ::graphwire::WireType::TagDelimited,
                )?;
                #(#write_fields)*
                writer.write_end_object();
                ::core::result::Result::Ok(())
            }

            #[allow(unused_mut)]
            fn read_value(
                &self,
                reader: &mut ::graphwire::Reader<'_>,
                header: &::graphwire::FieldHeader,
            ) -> ::graphwire::Result<#name> {
                ::graphwire::codec::expect_wire_type(
                    header,
                    ::graphwire::WireType::TagDelimited,
                    #codec_name,
                )?;
                reader.session_mut().mark_value_field();
                #(#declare_locals)*
                reader.read_object(|reader, field_id, field| {
                    match field_id {
                        #(#read_arms)*
                        _ => reader.consume_unknown_field(field)?,
                    }
                    ::core::result::Result::Ok(())
                })?;
                ::core::result::Result::Ok(#name {
                    #(#field_names: #locals),*
                })
            }
        }

        impl ::graphwire::DeepCopier<#name> for #codec {
            #[allow(unused_variables)]
            fn deep_copy(
                &self,
                value: &#name,
                context: &mut ::graphwire::CopyContext,
            ) -> ::graphwire::Result<#name> {
                ::core::result::Result::Ok(#name {
                    #(#copy_fields),*
                })
            }
        }

        #reserved_id_check

        impl ::graphwire::Serializable for #name {
            type Codec = #codec;
            const WELL_KNOWN_ID: ::core::option::Option<u32> = #well_known_id;

            fn type_name() -> ::std::borrow::Cow<'static, str> {
                ::std::borrow::Cow::Borrowed(#wire_name)
            }
        }
    })
}

fn parse_struct_options(input: &DeriveInput) -> syn::Result<StructOptions> {
    let mut options = StructOptions::default();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("wire")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                options.name = Some(meta.value()?.parse::<LitStr>()?);
                Ok(())
            } else if meta.path.is_ident("id") {
                let lit = meta.value()?.parse::<LitInt>()?;
                options.well_known_id = Some(lit.base10_parse::<u32>()?);
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"` or `id = N`"))
            }
        })?;
    }
    Ok(options)
}

fn parse_field_id(field: &syn::Field, position: u32) -> syn::Result<Option<u32>> {
    let mut id = Some(position);
    let mut explicit = false;
    let mut skip = false;
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("wire")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                let lit = meta.value()?.parse::<LitInt>()?;
                id = Some(lit.base10_parse::<u32>()?);
                explicit = true;
                Ok(())
            } else if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                Err(meta.error("expected `id = N` or `skip`"))
            }
        })?;
    }
    if skip && explicit {
        return Err(syn::Error::new_spanned(
            field,
            "`skip` and `id` cannot be combined",
        ));
    }
    if skip {
        id = None;
    }
    Ok(id)
}
