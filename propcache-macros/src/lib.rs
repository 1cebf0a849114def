use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Data, DeriveInput, Fields, FnArg, ImplItem, ImplItemFn, ItemImpl,
    ReturnType,
};

// Import shared utilities
use propcache_macro_utils::{
    has_serde_flatten, is_attr_cache_type, is_cached_attribute, parse_cached_flags, parse_field_attributes,
    parse_struct_attributes, slot_accessor_ident, type_ident_name, type_text,
};

/// A lazy method found in a `#[cached_props]` impl block
struct LazyMethod {
    accessor: syn::Ident,
    vis: syn::Visibility,
    name: String,
    flags: TokenStream2,
}

/// Check that a `#[cached]` method reads only `&self` and returns a value
fn validate_signature(method: &ImplItemFn) -> Result<(), TokenStream2> {
    let sig = &method.sig;

    if sig.asyncness.is_some() {
        return Err(quote! { compile_error!("`#[cached]` methods cannot be async"); });
    }
    if !sig.generics.params.is_empty() {
        return Err(quote! { compile_error!("`#[cached]` methods cannot be generic"); });
    }

    let mut inputs = sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => {
            return Err(quote! { compile_error!("`#[cached]` methods must take `&self`"); });
        }
    }
    if inputs.next().is_some() {
        return Err(
            quote! { compile_error!("`#[cached]` methods cannot take arguments besides `&self`"); },
        );
    }
    if let ReturnType::Default = sig.output {
        return Err(quote! { compile_error!("`#[cached]` methods must return a value"); });
    }

    Ok(())
}

/// Rewrite one `#[cached]` method so it reads through its slot
fn generate_lazy_method(method: &mut ImplItemFn) -> Result<Option<LazyMethod>, TokenStream2> {
    let position = match method.attrs.iter().position(is_cached_attribute) {
        Some(position) => position,
        None => return Ok(None),
    };
    let attr = method.attrs.remove(position);
    let flags = parse_cached_flags(&attr)?;
    validate_signature(method)?;

    let ident = method.sig.ident.clone();
    let accessor = slot_accessor_ident(&ident);
    let block = &method.block;

    let body: syn::Block = syn::parse_quote! {{
        Self::#accessor().get_or_compute(self, || #block)
    }};
    method.block = body;

    Ok(Some(LazyMethod {
        accessor,
        vis: method.vis.clone(),
        name: ident.to_string(),
        flags,
    }))
}

/// Turns `#[cached]` methods of an inherent impl block into lazy attributes.
///
/// Each `#[cached]` method is computed on its first call for an instance and
/// the result is stored in the instance's `AttrCache`; later calls return the
/// stored value until it is purged. The type must implement `HasAttrCache`
/// (usually through `#[derive(PropCache)]` with `#[propcache(lazy)]`).
///
/// # Method Attributes
///
/// - `#[cached]` - lazy attribute with flags `0`. Flags `0` are reset by a
///   full purge but never by a flag-based purge.
/// - `#[cached(EXPR)]` or `#[cached(flags = EXPR)]` - lazy attribute whose
///   flags bitmask is `EXPR` (any integer expression usable in a static
///   initializer; refer to constants by path, not through `Self`).
///
/// Separate `#[cached_props]` blocks for `a::Foo` and `b::Foo`, or for
/// `Foo<u32>` and `Foo<String>`, each get their own slots.
///
/// # Requirements
///
/// - **Signature**: `fn name(&self) -> R`, no other arguments, no generics
/// - **Return type**: `Clone + Send + Sync + 'static`; reads return clones
/// - **One block per type**: the macro implements `LazyMembers` for the type,
///   so only one `#[cached_props]` impl block per type is allowed
///
/// # Generated Items
///
/// - `fn <method>_slot() -> &'static AttrSlot`, with the method's
///   visibility, holding the method's slot in a function-local static
/// - `impl LazyMembers for Type`, listing every slot
///
/// # Examples
///
/// ```ignore
/// use propcache::{cached_props, AttrCache, PropCache};
///
/// const GEOMETRY: u64 = 0b01;
///
/// #[derive(PropCache)]
/// #[propcache(lazy)]
/// struct Rect {
///     w: f64,
///     h: f64,
///     cache: AttrCache,
/// }
///
/// #[cached_props]
/// impl Rect {
///     #[cached(GEOMETRY)]
///     fn area(&self) -> f64 {
///         self.w * self.h
///     }
///
///     #[cached]
///     fn label(&self) -> String {
///         format!("{}x{}", self.w, self.h)
///     }
/// }
///
/// let registry = PropCache::new();
/// registry.register::<Rect>();
///
/// let rect = Rect { w: 2.0, h: 3.0, cache: AttrCache::new() };
/// assert_eq!(rect.area(), 6.0);
/// registry.purge_by_flag(&rect, GEOMETRY).unwrap();
/// ```
#[proc_macro_attribute]
pub fn cached_props(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return TokenStream::from(
            quote! { compile_error!("`cached_props` takes no arguments"); },
        );
    }

    let mut input = parse_macro_input!(item as ItemImpl);

    if input.trait_.is_some() {
        return TokenStream::from(
            quote! { compile_error!("`cached_props` must be used on an inherent impl block"); },
        );
    }

    if type_ident_name(&input.self_ty).is_none() {
        return TokenStream::from(quote! { compile_error!("`cached_props` requires a named type"); });
    }

    // Rewrite cached methods in place
    let mut lazy_methods = Vec::new();
    for item in input.items.iter_mut() {
        if let ImplItem::Fn(method) = item {
            match generate_lazy_method(method) {
                Ok(Some(lazy)) => lazy_methods.push(lazy),
                Ok(None) => {}
                Err(err) => return TokenStream::from(err),
            }
        }
    }

    // Each accessor owns its slot in a function-local static, so slots of
    // same-named types or methods never share an item name.
    for lazy in &lazy_methods {
        let LazyMethod {
            accessor,
            vis,
            name,
            flags,
        } = lazy;
        input.items.push(ImplItem::Verbatim(quote! {
            #vis fn #accessor() -> &'static ::propcache_core::AttrSlot {
                static SLOT: ::once_cell::sync::Lazy<::propcache_core::AttrSlot> =
                    ::once_cell::sync::Lazy::new(|| ::propcache_core::AttrSlot::new(#name, (#flags) as u64));
                &SLOT
            }
        }));
    }
    let accessors = lazy_methods.iter().map(|lazy| &lazy.accessor);

    let self_ty = &input.self_ty;
    let (impl_generics, _, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        #input

        impl #impl_generics ::propcache_core::LazyMembers for #self_ty #where_clause {
            fn lazy_slots() -> ::std::vec::Vec<::propcache_core::AttrSlot> {
                ::std::vec![#(::core::clone::Clone::clone(Self::#accessors())),*]
            }
        }
    };

    TokenStream::from(expanded)
}

/// Derives the registration declarations of a struct.
///
/// Generates:
///
/// - `HasAttrCache`, returning the field marked `#[propcache(cache)]`, or
///   else the field declared as `AttrCache`. A marked field may be any type
///   implementing `HasAttrCache`, such as an embedded parent struct, in which
///   case the parent's cache is shared.
/// - `PropsDecl`: every named field's declared type as an annotation (a type
///   naming `Unserialized` excludes the field), fields marked
///   `#[propcache(exclude)]`, and the parents listed in
///   `#[propcache(parents(..))]`.
/// - An empty `LazyMembers` impl, unless `#[propcache(lazy)]` says the lazy
///   members come from a `#[cached_props]` impl block.
/// - `GetState` through `default_state` when `#[propcache(serde)]` is given
///   (the struct must implement `Serialize`). A `#[propcache(cache)]` field
///   that embeds a parent must then also be `#[serde(flatten)]`: filtering
///   only removes top-level attributes.
///
/// # Examples
///
/// ```ignore
/// use propcache::{AttrCache, PropCache};
/// use serde::Serialize;
///
/// #[derive(Serialize, PropCache)]
/// #[propcache(serde)]
/// struct Session {
///     user: String,
///     #[propcache(exclude)]
///     token: String,
///     #[serde(skip)]
///     cache: AttrCache,
/// }
/// ```
#[proc_macro_derive(PropCache, attributes(propcache))]
pub fn derive_prop_cache(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match generate_derive(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err),
    }
}

fn generate_derive(input: &DeriveInput) -> Result<TokenStream2, TokenStream2> {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let struct_attrs = parse_struct_attributes(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(
                    quote! { compile_error!("`PropCache` can only be derived for structs with named fields"); },
                )
            }
        },
        _ => {
            return Err(quote! { compile_error!("`PropCache` can only be derived for structs"); })
        }
    };

    let mut marked_cache = None;
    let mut typed_cache = None;
    let mut annotations = Vec::new();
    let mut excluded = Vec::new();

    for field in fields {
        let field_attrs = parse_field_attributes(field)?;
        let field_ident = match &field.ident {
            Some(field_ident) => field_ident,
            None => continue,
        };
        let name = field_ident.to_string();

        if field_attrs.cache {
            if marked_cache.is_some() {
                return Err(
                    quote! { compile_error!("only one field can be marked `#[propcache(cache)]`"); },
                );
            }
            // An embedded parent must serialize flat, or its excluded
            // attributes would survive under the field's nested key.
            if struct_attrs.serde && !is_attr_cache_type(&field.ty) && !has_serde_flatten(field) {
                let msg = format!(
                    "field `{}` embeds a parent through `#[propcache(cache)]`; add `#[serde(flatten)]` so the parent's attributes are filtered",
                    name
                );
                return Err(quote! { compile_error!(#msg); });
            }
            marked_cache = Some(field_ident);
        } else if typed_cache.is_none() && is_attr_cache_type(&field.ty) {
            typed_cache = Some(field_ident);
        }

        if field_attrs.exclude {
            excluded.push(name.clone());
        }

        let text = type_text(&field.ty);
        annotations.push(quote! {
            (#name, ::propcache_core::Annotation::text(#text))
        });
    }

    let cache_field = match marked_cache.or(typed_cache) {
        Some(cache_field) => cache_field,
        None => {
            return Err(
                quote! { compile_error!("`PropCache` needs an `AttrCache` field or a field marked `#[propcache(cache)]`"); },
            )
        }
    };

    let parents = struct_attrs.parents.iter().map(|parent| {
        quote! { ::propcache_core::TypeKey::of::<#parent>() }
    });

    let lazy_members = if struct_attrs.lazy {
        quote! {}
    } else {
        quote! {
            impl #impl_generics ::propcache_core::LazyMembers for #ident #ty_generics #where_clause {}
        }
    };

    let get_state = if struct_attrs.serde {
        quote! {
            impl #impl_generics ::propcache_core::GetState for #ident #ty_generics #where_clause {
                fn get_state(&self) -> ::propcache_core::Result<::propcache_core::StateMap> {
                    ::propcache_core::default_state(self)
                }
            }
        }
    } else {
        quote! {}
    };

    Ok(quote! {
        impl #impl_generics ::propcache_core::HasAttrCache for #ident #ty_generics #where_clause {
            fn attr_cache(&self) -> &::propcache_core::AttrCache {
                ::propcache_core::HasAttrCache::attr_cache(&self.#cache_field)
            }
        }

        impl #impl_generics ::propcache_core::PropsDecl for #ident #ty_generics #where_clause {
            fn annotations() -> ::std::vec::Vec<(&'static str, ::propcache_core::Annotation)> {
                ::std::vec![#(#annotations),*]
            }

            fn excluded_attrs() -> ::std::vec::Vec<&'static str> {
                ::std::vec![#(#excluded),*]
            }

            fn parents() -> ::std::vec::Vec<::propcache_core::TypeKey> {
                ::std::vec![#(#parents),*]
            }
        }

        #lazy_members

        #get_state
    })
}

/// Marks a method inside a `#[cached_props]` impl block as a lazy attribute.
///
/// `#[cached_props]` consumes this attribute; reaching this macro means the
/// method is not inside such a block.
#[proc_macro_attribute]
pub fn cached(_attr: TokenStream, _item: TokenStream) -> TokenStream {
    TokenStream::from(quote! {
        compile_error!("`#[cached]` can only be used on methods inside a `#[cached_props]` impl block");
    })
}
