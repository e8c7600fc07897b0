//! # memora-macros
//!
//! The `#[memoize]` attribute of the [`memora`](https://docs.rs/memora) crate.
//! Depend on `memora` rather than on this crate: the generated code refers to
//! `::memora` paths.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::visit::{self, Visit};
use syn::{
    parse_macro_input, FnArg, GenericArgument, Ident, ItemFn, Pat, PathArguments, ReturnType, Type,
};

mod attributes;

use attributes::{parse_attributes, MemoizeAttributes};

/// Memoizes a function through a cache engine.
///
/// Every call derives a key from the function name and its arguments (each
/// argument must implement `CacheableKey`), returns the engine's value on a
/// hit, and otherwise runs the body and stores its result. The function keeps
/// its signature, visibility, attributes and doc comments.
///
/// # Attributes
///
/// - `engine = <expr>` (required): the engine, evaluated once on first call
/// - `expiry = <seconds> | none`: expiry passed to every `set` (default: none)
/// - `key_fn = <expr>`: key function, e.g. `memora::hashed_key`
/// - `name = "<str>"`: function identity used in keys and in the stats registry
/// - `single_flight = <bool>`: compute at most once per key concurrently
///
/// # Results
///
/// A function returning `Result<T, E>` caches only `Ok(T)` values; errors are
/// returned without being stored.
///
/// # Engine failures
///
/// The signature leaves no room for cache errors, so engine failures are
/// logged at `warn` and the body runs as if the cache missed. Use
/// `Memoize::get_or_compute` directly to handle them.
///
/// # Examples
///
/// ```ignore
/// use memora::{memoize, InMemoryEngine};
///
/// #[memoize(engine = InMemoryEngine::new(100))]
/// fn fibonacci(n: u64) -> u64 {
///     if n <= 1 {
///         return n;
///     }
///     fibonacci(n - 1) + fibonacci(n - 2)
/// }
/// ```
///
/// # Limitations
///
/// Generic functions, `async fn` and methods taking `self` are rejected.
/// Arguments must be plain identifiers, and the cached type must be `'static`
/// and must not mention `Self`: a return type holding a non-`'static`
/// reference or lifetime is rejected.
#[proc_macro_attribute]
pub fn memoize(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    match expand(attr.into(), input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn expand(attr: TokenStream2, input: ItemFn) -> syn::Result<TokenStream2> {
    let attrs = parse_attributes(attr)?;

    let fn_attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let ident = &sig.ident;
    let block = &input.block;

    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new(
            sig.generics.span(),
            "#[memoize] does not support generic functions",
        ));
    }
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new(
            asyncness.span(),
            "#[memoize] does not support async functions",
        ));
    }

    let arg_idents = argument_idents(sig)?;
    if let ReturnType::Type(_, ty) = &sig.output {
        reject_borrowed_return(ty)?;
    }

    let ret_type = match &sig.output {
        ReturnType::Type(_, ty) => quote! { #ty },
        ReturnType::Default => quote! { () },
    };

    // Only the Ok type of a Result is cached
    let (value_type, is_result) = match &sig.output {
        ReturnType::Type(_, ty) => match result_ok_type(ty) {
            Some(ok) => (quote! { #ok }, true),
            None => (quote! { #ty }, false),
        },
        ReturnType::Default => (quote! { () }, false),
    };

    let memo_ident = format_ident!("__MEMORA_MEMOIZE_{}", ident.to_string().to_uppercase());
    let fn_name_str = attrs
        .custom_name
        .clone()
        .unwrap_or_else(|| ident.to_string());

    let init = generate_initializer(&attrs, &value_type, &fn_name_str);

    let call = if is_result {
        quote! { get_or_try_compute_best_effort }
    } else {
        quote! { get_or_compute_best_effort }
    };

    Ok(quote! {
        #(#fn_attrs)*
        #vis #sig {
            static #memo_ident: ::memora::__private::Lazy<::memora::Memoize<#value_type>> =
                ::memora::__private::Lazy::new(|| #init);

            let __args = ::memora::Args::new() #( .arg(&#arg_idents) )*;
            #memo_ident.#call(#fn_name_str, &__args, move || -> #ret_type #block)
        }
    })
}

fn generate_initializer(
    attrs: &MemoizeAttributes,
    value_type: &TokenStream2,
    fn_name_str: &str,
) -> TokenStream2 {
    let engine = &attrs.engine;
    let expiry = &attrs.expiry;
    let single_flight = attrs.single_flight;
    let key_fn = attrs
        .key_fn
        .as_ref()
        .map(|key_fn| quote! { .with_key_fn(#key_fn) });

    quote! {{
        let __memo = ::memora::Memoize::<#value_type>::new(#engine)
            .with_expiry(#expiry)
            .with_single_flight(#single_flight)
            #key_fn;
        ::memora::__private::register_stats(&__memo, #fn_name_str);
        __memo
    }}
}

/// Collects argument names, rejecting receivers and destructuring patterns.
fn argument_idents(sig: &syn::Signature) -> syn::Result<Vec<Ident>> {
    let mut idents = Vec::new();
    for arg in sig.inputs.iter() {
        match arg {
            FnArg::Receiver(receiver) => {
                return Err(syn::Error::new(
                    receiver.span(),
                    "#[memoize] does not support methods taking `self`; memoize a free function instead",
                ))
            }
            FnArg::Typed(pat_type) => match pat_type.pat.as_ref() {
                Pat::Ident(pat_ident) if pat_ident.subpat.is_none() => {
                    idents.push(pat_ident.ident.clone())
                }
                other => {
                    return Err(syn::Error::new(
                        other.span(),
                        "#[memoize] arguments must be plain identifiers",
                    ))
                }
            },
        }
    }
    Ok(idents)
}

/// Cached values live in a `static`, so the return type may only borrow for `'static`.
fn reject_borrowed_return(ty: &Type) -> syn::Result<()> {
    let mut finder = BorrowFinder { found: None };
    finder.visit_type(ty);
    match finder.found {
        Some(span) => Err(syn::Error::new(
            span,
            "#[memoize] cannot cache a return value that borrows from the arguments; \
             return an owned type or a `'static` reference",
        )),
        None => Ok(()),
    }
}

struct BorrowFinder {
    found: Option<proc_macro2::Span>,
}

impl<'ast> Visit<'ast> for BorrowFinder {
    fn visit_type_reference(&mut self, reference: &'ast syn::TypeReference) {
        if reference.lifetime.is_none() && self.found.is_none() {
            self.found = Some(reference.and_token.span());
        }
        visit::visit_type_reference(self, reference);
    }

    fn visit_lifetime(&mut self, lifetime: &'ast syn::Lifetime) {
        if lifetime.ident != "static" && self.found.is_none() {
            self.found = Some(lifetime.span());
        }
    }

    // `fn(&str) -> usize` borrows nothing by itself
    fn visit_type_bare_fn(&mut self, _: &'ast syn::TypeBareFn) {}

    fn visit_type_impl_trait(&mut self, impl_trait: &'ast syn::TypeImplTrait) {
        if self.found.is_none() {
            self.found = Some(impl_trait.impl_token.span());
        }
    }
}

/// `T` for a return type spelled `Result<T, ..>` (any path ending in `Result`).
fn result_ok_type(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Result" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}
