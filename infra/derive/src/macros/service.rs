use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Fields, ItemStruct};

/// Splits `struct Foo { .. }` into `FooInner { .. }` plus a cloneable `Foo` handle.
pub fn expand_service(input: ItemStruct) -> TokenStream {
    if !matches!(input.fields, Fields::Named(_) | Fields::Unit) {
        return syn::Error::new_spanned(
            &input.ident,
            "mosaic_service requires a struct with named fields",
        )
        .to_compile_error();
    }
    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(&input.generics, "mosaic_service does not support generics")
            .to_compile_error();
    }

    let handle = &input.ident;
    let vis = &input.vis;
    let attrs = &input.attrs;
    let inner = format_ident!("{handle}Inner");
    let body = match &input.fields {
        Fields::Named(named) => quote! { #named },
        _ => quote! { {} },
    };

    quote! {
        #(#attrs)*
        #[derive(Debug)]
        #vis struct #inner #body

        #[derive(Debug, Clone)]
        #vis struct #handle {
            inner: std::sync::Arc<#inner>,
        }

        impl #handle {
            #[must_use]
            pub fn new(inner: #inner) -> Self {
                Self { inner: std::sync::Arc::new(inner) }
            }

            /// Number of live handles sharing this service instance.
            #[must_use]
            pub fn handle_count(&self) -> usize {
                std::sync::Arc::strong_count(&self.inner)
            }
        }

        impl From<#inner> for #handle {
            fn from(inner: #inner) -> Self {
                Self::new(inner)
            }
        }

        impl std::ops::Deref for #handle {
            type Target = #inner;

            fn deref(&self) -> &Self::Target {
                &self.inner
            }
        }
    }
}
