// Copyright (C) Microsoft Corporation. All rights reserved.

//! Procedural macro behind [`test_with_tracing`]'s `#[test]` attribute.
//!
//! The macro wraps a standard Rust test so that the `tracing` subscriber is
//! installed before the test body runs and the body executes inside a span
//! named after the test.

use proc_macro::*;
use quote::quote;
use syn::spanned::*;
use syn::*;

/// Attribute macro for tests with tracing output.
///
/// Wraps the annotated function in a `#[test]` that initializes tracing and
/// enters an INFO-level span named after the test. The function must be
/// synchronous and take no arguments.
///
/// # Errors
///
/// Returns a compile error if:
/// - The function is marked as async
/// - The function has any parameters
#[proc_macro_attribute]
pub fn test(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let item = parse_macro_input!(item as ItemFn);
    make_test(item)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// Generates the wrapper for the `test` attribute macro.
///
/// The emitted function:
/// 1. Initializes tracing via `test_with_tracing::init`
/// 2. Creates a named tracing span for the test
/// 3. Enters the span and executes the original test function
///
/// # Arguments
///
/// * `item` - The function item to transform into a test
///
/// # Returns
///
/// Returns a token stream representing the transformed test function,
/// or an error if the function signature is invalid.
fn make_test(item: ItemFn) -> syn::Result<proc_macro2::TokenStream> {
    if item.sig.asyncness.is_some() {
        return Err(Error::new(
            item.sig.fn_token.span(),
            "test function must not be async",
        ));
    }

    let name = &item.sig.ident;
    let return_type = &item.sig.output;
    if !item.sig.inputs.is_empty() {
        return Err(Error::new(item.sig.inputs.span(), "expected 0 arguments"));
    };
    let attrs = &item.attrs;

    Ok(quote! {
        #[::core::prelude::v1::test]
        #(#attrs)*
        fn #name() #return_type {
            #item
            ::test_with_tracing::init();
            let span = tracing::span!(tracing::Level::INFO, stringify!(#name));
            let _span_guard = span.enter();
            #name()
        }
    })
}
