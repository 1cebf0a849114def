//! Shared utilities for propcache procedural macros
//!
//! This crate provides the attribute parsing and naming helpers used by
//! `propcache-macros`.

use proc_macro2::{TokenStream as TokenStream2, TokenTree};
use quote::{format_ident, quote};
use syn::{Attribute, Expr, Field, Meta, MetaNameValue, Path, Type};

/// Name of the helper attribute read by `#[derive(PropCache)]`.
pub const PROPCACHE_ATTR: &str = "propcache";

/// Name of the method attribute read by `#[cached_props]`.
pub const CACHED_ATTR: &str = "cached";

/// Parsed struct-level `#[propcache(...)]` attributes
#[derive(Default)]
pub struct StructAttributes {
    /// Parent types, in declaration order
    pub parents: Vec<Path>,
    /// The type's lazy members come from a `#[cached_props]` impl block
    pub lazy: bool,
    /// Implement `GetState` through the type's `Serialize` impl
    pub serde: bool,
}

/// Parsed field-level `#[propcache(...)]` attributes
#[derive(Default)]
pub struct FieldAttributes {
    pub cache: bool,
    pub exclude: bool,
}

fn compile_error(err: syn::Error) -> TokenStream2 {
    err.to_compile_error()
}

/// Parse the flags expression of a `#[cached]` attribute.
///
/// Accepted forms: `#[cached]` (flags `0`), `#[cached(EXPR)]`,
/// `#[cached(flags = EXPR)]` and `#[cached = EXPR]`.
pub fn parse_cached_flags(attr: &Attribute) -> Result<TokenStream2, TokenStream2> {
    match &attr.meta {
        Meta::Path(_) => Ok(quote! { 0u64 }),
        Meta::NameValue(nv) => {
            let value = &nv.value;
            Ok(quote! { #value })
        }
        Meta::List(list) => parse_flags_tokens(list.tokens.clone()),
    }
}

/// Parse the tokens inside `#[cached(...)]`
pub fn parse_flags_tokens(tokens: TokenStream2) -> Result<TokenStream2, TokenStream2> {
    if tokens.is_empty() {
        return Ok(quote! { 0u64 });
    }

    if let Ok(nv) = syn::parse2::<MetaNameValue>(tokens.clone()) {
        if nv.path.is_ident("flags") {
            let value = nv.value;
            return Ok(quote! { #value });
        }
        return Err(quote! { compile_error!("Invalid argument for `cached`: expected `flags = <expr>` or a flags expression") });
    }

    match syn::parse2::<Expr>(tokens) {
        Ok(expr) => Ok(quote! { #expr }),
        Err(err) => {
            let msg = format!("Failed to parse `cached` flags: {}", err);
            Err(quote! { compile_error!(#msg) })
        }
    }
}

/// Whether an attribute is `#[cached]` / `#[cached(...)]`
pub fn is_cached_attribute(attr: &Attribute) -> bool {
    attr.path().is_ident(CACHED_ATTR)
}

/// Last path segment of a type, e.g. `Shape` for `crate::geo::Shape<T>`
pub fn type_ident_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string()),
        Type::Group(group) => type_ident_name(&group.elem),
        Type::Paren(paren) => type_ident_name(&paren.elem),
        _ => None,
    }
}

/// Whether a field is declared with the `AttrCache` type
pub fn is_attr_cache_type(ty: &Type) -> bool {
    type_ident_name(ty).as_deref() == Some("AttrCache")
}

/// Whether a field carries `#[serde(flatten)]`
pub fn has_serde_flatten(field: &Field) -> bool {
    field
        .attrs
        .iter()
        .filter(|attr| attr.path().is_ident("serde"))
        .any(|attr| match &attr.meta {
            Meta::List(list) => list
                .tokens
                .clone()
                .into_iter()
                .any(|token| matches!(token, TokenTree::Ident(ident) if ident == "flatten")),
            _ => false,
        })
}

/// Source text of a declared type, as used for annotations
pub fn type_text(ty: &Type) -> String {
    quote!(#ty).to_string()
}

/// Identifier of the generated `<method>_slot()` accessor
pub fn slot_accessor_ident(method: &syn::Ident) -> syn::Ident {
    format_ident!("{}_slot", method)
}

/// Parse every struct-level `#[propcache(...)]` attribute
pub fn parse_struct_attributes(attrs: &[Attribute]) -> Result<StructAttributes, TokenStream2> {
    let mut parsed = StructAttributes::default();

    for attr in attrs.iter().filter(|a| a.path().is_ident(PROPCACHE_ATTR)) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("parents") {
                meta.parse_nested_meta(|parent| {
                    parsed.parents.push(parent.path.clone());
                    Ok(())
                })
            } else if meta.path.is_ident("lazy") {
                parsed.lazy = true;
                Ok(())
            } else if meta.path.is_ident("serde") {
                parsed.serde = true;
                Ok(())
            } else {
                Err(meta.error("unsupported propcache attribute: expected `parents(..)`, `lazy` or `serde`"))
            }
        })
        .map_err(compile_error)?;
    }

    Ok(parsed)
}

/// Parse the `#[propcache(...)]` attributes of one field
pub fn parse_field_attributes(field: &Field) -> Result<FieldAttributes, TokenStream2> {
    let mut parsed = FieldAttributes::default();

    for attr in field.attrs.iter().filter(|a| a.path().is_ident(PROPCACHE_ATTR)) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("cache") {
                parsed.cache = true;
                Ok(())
            } else if meta.path.is_ident("exclude") {
                parsed.exclude = true;
                Ok(())
            } else {
                Err(meta.error("unsupported propcache field attribute: expected `cache` or `exclude`"))
            }
        })
        .map_err(compile_error)?;
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_bare_cached_has_zero_flags() {
        let attr: Attribute = parse_quote!(#[cached]);
        let flags = parse_cached_flags(&attr).unwrap_or_else(|e| e);
        assert_eq!(flags.to_string(), "0u64");
    }

    #[test]
    fn test_cached_with_expression() {
        let attr: Attribute = parse_quote!(#[cached(GEOMETRY | COLOR)]);
        let flags = parse_cached_flags(&attr).unwrap_or_else(|e| e);
        assert_eq!(flags.to_string(), "GEOMETRY | COLOR");
    }

    #[test]
    fn test_cached_with_named_flags() {
        let attr: Attribute = parse_quote!(#[cached(flags = 0b10)]);
        let flags = parse_cached_flags(&attr).unwrap_or_else(|e| e);
        assert_eq!(flags.to_string(), "0b10");
    }

    #[test]
    fn test_cached_with_unknown_name() {
        let attr: Attribute = parse_quote!(#[cached(limit = 3)]);
        assert!(parse_cached_flags(&attr).is_err());
    }

    #[test]
    fn test_type_names() {
        let ty: Type = parse_quote!(crate::geo::Shape<f64>);
        assert_eq!(type_ident_name(&ty).as_deref(), Some("Shape"));

        let cache: Type = parse_quote!(propcache::AttrCache);
        assert!(is_attr_cache_type(&cache));

        let reference: Type = parse_quote!(&'static str);
        assert_eq!(type_ident_name(&reference), None);
    }

    #[test]
    fn test_slot_accessor_ident() {
        let method: syn::Ident = parse_quote!(area);
        assert_eq!(slot_accessor_ident(&method).to_string(), "area_slot");
    }

    #[test]
    fn test_serde_flatten_detection() {
        let item: syn::ItemStruct = parse_quote! {
            struct Child {
                #[serde(flatten)]
                base: Base,
                #[serde(skip_serializing_if = "Option::is_none", flatten)]
                extra: Option<Extra>,
                #[serde(rename = "flatten")]
                renamed: u32,
                #[propcache(cache)]
                plain: Base,
            }
        };

        let flags: Vec<bool> = item.fields.iter().map(has_serde_flatten).collect();
        assert_eq!(flags, vec![true, true, false, false]);
    }

    #[test]
    fn test_struct_attributes() {
        let item: syn::DeriveInput = parse_quote! {
            #[propcache(parents(Base, other::Mixin), lazy)]
            #[propcache(serde)]
            struct Child {
                cache: AttrCache,
            }
        };

        let attrs = parse_struct_attributes(&item.attrs).unwrap_or_default();
        assert_eq!(attrs.parents.len(), 2);
        assert!(attrs.lazy);
        assert!(attrs.serde);
    }

    #[test]
    fn test_struct_attributes_reject_unknown() {
        let item: syn::DeriveInput = parse_quote! {
            #[propcache(ttl = 3)]
            struct Child;
        };

        assert!(parse_struct_attributes(&item.attrs).is_err());
    }

    #[test]
    fn test_field_attributes() {
        let item: syn::ItemStruct = parse_quote! {
            struct Sample {
                #[propcache(exclude)]
                token: String,
                #[propcache(cache)]
                base: Base,
                plain: u32,
            }
        };

        let fields: Vec<&Field> = item.fields.iter().collect();
        let token = parse_field_attributes(fields[0]).unwrap_or_default();
        let base = parse_field_attributes(fields[1]).unwrap_or_default();
        let plain = parse_field_attributes(fields[2]).unwrap_or_default();

        assert!(token.exclude && !token.cache);
        assert!(base.cache && !base.exclude);
        assert!(!plain.cache && !plain.exclude);
    }
}
