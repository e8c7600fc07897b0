//! Parsing of `#[memoize(...)]` arguments.

use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::spanned::Spanned;
use syn::{punctuated::Punctuated, Expr, Lit, MetaNameValue, Token};

/// Parsed macro attributes
pub struct MemoizeAttributes {
    pub engine: Expr,
    pub expiry: TokenStream2,
    pub key_fn: Option<Expr>,
    pub custom_name: Option<String>,
    pub single_flight: bool,
}

/// Parse the `expiry` attribute: whole or fractional seconds, or `none`
fn parse_expiry_attribute(nv: &MetaNameValue) -> syn::Result<TokenStream2> {
    match &nv.value {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Int(lit_int) => {
                let secs = lit_int.base10_parse::<u64>()?;
                if secs == 0 {
                    return Err(syn::Error::new(
                        lit_int.span(),
                        "`expiry` must be greater than zero; use `expiry = none` for no expiry",
                    ));
                }
                Ok(quote! { ::core::option::Option::Some(::std::time::Duration::from_secs(#secs)) })
            }
            Lit::Float(lit_float) => {
                let secs = lit_float.base10_parse::<f64>()?;
                if !(secs > 0.0 && secs.is_finite()) {
                    return Err(syn::Error::new(
                        lit_float.span(),
                        "`expiry` must be a positive number of seconds",
                    ));
                }
                Ok(quote! { ::core::option::Option::Some(::std::time::Duration::from_secs_f64(#secs)) })
            }
            other => Err(syn::Error::new(
                other.span(),
                "invalid literal for `expiry`: expected seconds",
            )),
        },
        Expr::Path(path) if path.path.is_ident("none") || path.path.is_ident("None") => {
            Ok(quote! { ::core::option::Option::None })
        }
        other => Err(syn::Error::new(
            other.span(),
            "invalid syntax for `expiry`: expected `expiry = <seconds>` or `expiry = none`",
        )),
    }
}

/// Parse the `name` attribute
fn parse_name_attribute(nv: &MetaNameValue) -> syn::Result<String> {
    match &nv.value {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Str(s) if !s.value().is_empty() => Ok(s.value()),
            other => Err(syn::Error::new(
                other.span(),
                "invalid literal for `name`: expected a non-empty string",
            )),
        },
        other => Err(syn::Error::new(
            other.span(),
            "invalid syntax for `name`: expected `name = \"...\"`",
        )),
    }
}

/// Parse the `single_flight` attribute
fn parse_bool_attribute(nv: &MetaNameValue, attribute: &str) -> syn::Result<bool> {
    match &nv.value {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Bool(b) => Ok(b.value),
            other => Err(syn::Error::new(
                other.span(),
                format!("invalid literal for `{}`: expected `true` or `false`", attribute),
            )),
        },
        other => Err(syn::Error::new(
            other.span(),
            format!("invalid syntax for `{}`: expected `true` or `false`", attribute),
        )),
    }
}

/// Parse `#[memoize(...)]` arguments from a token stream
pub fn parse_attributes(attr: TokenStream2) -> syn::Result<MemoizeAttributes> {
    use syn::parse::Parser;

    let parser = Punctuated::<MetaNameValue, Token![,]>::parse_terminated;
    let parsed_args = parser.parse2(attr)?;

    let mut engine = None;
    let mut expiry = quote! { ::memora::DEFAULT_EXPIRY };
    let mut key_fn = None;
    let mut custom_name = None;
    let mut single_flight = false;

    for nv in parsed_args {
        if nv.path.is_ident("engine") {
            engine = Some(nv.value);
        } else if nv.path.is_ident("expiry") {
            expiry = parse_expiry_attribute(&nv)?;
        } else if nv.path.is_ident("key_fn") {
            key_fn = Some(nv.value);
        } else if nv.path.is_ident("name") {
            custom_name = Some(parse_name_attribute(&nv)?);
        } else if nv.path.is_ident("single_flight") {
            single_flight = parse_bool_attribute(&nv, "single_flight")?;
        } else {
            return Err(syn::Error::new(
                nv.path.span(),
                "unknown attribute: expected `engine`, `expiry`, `key_fn`, `name` or `single_flight`",
            ));
        }
    }

    let engine = engine.ok_or_else(|| {
        syn::Error::new(
            Span::call_site(),
            "missing cache engine: add `engine = <expression>`, e.g. `engine = InMemoryEngine::new(100)`",
        )
    })?;

    Ok(MemoizeAttributes {
        engine,
        expiry,
        key_fn,
        custom_name,
        single_flight,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_is_required() {
        let err = parse_attributes(quote! { expiry = 10 }).err().unwrap();
        assert!(err.to_string().contains("missing cache engine"));
    }

    #[test]
    fn test_defaults() {
        let attrs = parse_attributes(quote! { engine = InMemoryEngine::new(10) }).unwrap();
        assert_eq!(attrs.expiry.to_string(), quote! { ::memora::DEFAULT_EXPIRY }.to_string());
        assert!(attrs.key_fn.is_none());
        assert!(attrs.custom_name.is_none());
        assert!(!attrs.single_flight);
    }

    #[test]
    fn test_all_attributes() {
        let attrs = parse_attributes(quote! {
            engine = VolatileEngine::new(),
            expiry = 30,
            key_fn = memora::hashed_key,
            name = "lookup",
            single_flight = true
        })
        .unwrap();

        assert!(attrs.expiry.to_string().contains("from_secs"));
        assert!(attrs.key_fn.is_some());
        assert_eq!(attrs.custom_name.as_deref(), Some("lookup"));
        assert!(attrs.single_flight);
    }

    #[test]
    fn test_expiry_none() {
        let attrs = parse_attributes(quote! { engine = e(), expiry = none }).unwrap();
        assert_eq!(
            attrs.expiry.to_string(),
            quote! { ::core::option::Option::None }.to_string()
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(parse_attributes(quote! { engine = e(), expiry = 0 }).is_err());
        assert!(parse_attributes(quote! { engine = e(), expiry = "10" }).is_err());
        assert!(parse_attributes(quote! { engine = e(), name = 5 }).is_err());
        assert!(parse_attributes(quote! { engine = e(), single_flight = 1 }).is_err());
        assert!(parse_attributes(quote! { engine = e(), limit = 10 }).is_err());
    }
}
