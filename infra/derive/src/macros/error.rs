use fxhash::FxHashSet;
use proc_macro2::TokenStream;
use quote::{ToTokens, format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Field, Fields, Ident, Type, Variant};

/// Accepted spellings of the context field type once whitespace is removed.
const CONTEXT_TYPES: &[&str] = &[
    "Cow<'static,str>",
    "std::borrow::Cow<'static,str>",
    "alloc::borrow::Cow<'static,str>",
    "::std::borrow::Cow<'static,str>",
];

/// Parsed view of an error enum annotated with `#[mosaic_error]`.
struct ErrorEnum<'a> {
    input: &'a DeriveInput,
    ext: Ident,
    variants: Vec<ErrorVariant<'a>>,
}

struct ErrorVariant<'a> {
    ident: &'a Ident,
    source: Option<(&'a Ident, &'a Type)>,
    contextual: bool,
    cfgs: Vec<&'a Attribute>,
}

impl ErrorVariant<'_> {
    fn is_internal(&self) -> bool {
        self.ident == "Internal"
    }
}

pub fn expand_derive(input: DeriveInput) -> TokenStream {
    match ErrorEnum::parse(&input) {
        Ok(model) => model.render(),
        Err(err) => err.to_compile_error(),
    }
}

impl<'a> ErrorEnum<'a> {
    fn parse(input: &'a DeriveInput) -> syn::Result<Self> {
        let Data::Enum(data) = &input.data else {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "mosaic_error can only be applied to enums",
            ));
        };

        let variants = data.variants.iter().map(parse_variant).collect::<syn::Result<Vec<_>>>()?;

        if let Some(bad) = variants.iter().find(|v| v.source.is_some() && !v.contextual) {
            return Err(syn::Error::new_spanned(
                bad.ident,
                "mosaic_error requires `context: Option<Cow<'static, str>>` next to a source field",
            ));
        }

        Ok(Self { input, ext: format_ident!("{}Ext", input.ident), variants })
    }

    fn render(&self) -> TokenStream {
        let input = self.input;
        let derives = self.missing_derives();
        let ext_trait = self.render_ext_trait();
        let source_impls = self.variants.iter().filter_map(|v| self.render_source_impls(v));
        let message_impls = self.render_message_impls();

        quote! {
            #[allow(non_shorthand_field_patterns)]
            #derives
            #input

            #ext_trait
            #(#source_impls)*
            #message_impls

            #[allow(dead_code)]
            fn format_context(
                context: &Option<std::borrow::Cow<'static, str>>,
            ) -> std::borrow::Cow<'static, str> {
                match context {
                    Some(c) => std::borrow::Cow::Owned(format!(" ({c})")),
                    None => std::borrow::Cow::Borrowed(""),
                }
            }
        }
    }

    fn missing_derives(&self) -> TokenStream {
        let present = derived_traits(&self.input.attrs);
        let mut missing = Vec::new();
        if !present.contains("Debug") {
            missing.push(quote! { Debug });
        }
        if !present.contains("Error") {
            missing.push(quote! { ::thiserror::Error });
        }
        if missing.is_empty() { quote! {} } else { quote! { #[derive(#(#missing),*)] } }
    }

    fn render_ext_trait(&self) -> TokenStream {
        let name = &self.input.ident;
        let ext = &self.ext;
        let arms = self.variants.iter().filter(|v| v.contextual).map(|v| {
            let ident = v.ident;
            let cfgs = &v.cfgs;
            quote! { #(#cfgs)* #name::#ident { context: slot, .. } => *slot = Some(context.into()), }
        });

        quote! {
            pub trait #ext<T> {
                fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> Result<T, #name>;
            }

            #[automatically_derived]
            impl<T> #ext<T> for Result<T, #name> {
                #[inline]
                fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> Self {
                    self.map_err(|mut err| {
                        match &mut err {
                            #(#arms)*
                            _ => {}
                        }
                        err
                    })
                }
            }
        }
    }

    fn render_source_impls(&self, variant: &ErrorVariant<'_>) -> Option<TokenStream> {
        if variant.is_internal() {
            return None;
        }
        let (field, ty) = variant.source?;
        let name = &self.input.ident;
        let ext = &self.ext;
        let ident = variant.ident;
        let cfgs = &variant.cfgs;

        Some(quote! {
            #(#cfgs)*
            #[automatically_derived]
            impl From<#ty> for #name {
                #[inline]
                fn from(#field: #ty) -> Self {
                    Self::#ident { #field, context: None }
                }
            }

            #(#cfgs)*
            impl<T> #ext<T> for std::result::Result<T, #ty> {
                #[inline]
                fn context(
                    self,
                    context: impl Into<std::borrow::Cow<'static, str>>,
                ) -> std::result::Result<T, #name> {
                    self.map_err(|#field| #name::#ident { #field, context: Some(context.into()) })
                }
            }
        })
    }

    fn render_message_impls(&self) -> TokenStream {
        let Some(internal) = self.variants.iter().find(|v| v.is_internal()) else {
            return quote! {};
        };
        let name = &self.input.ident;
        let cfgs = &internal.cfgs;

        quote! {
            #(#cfgs)*
            impl From<&'static str> for #name {
                #[inline]
                fn from(message: &'static str) -> Self {
                    Self::Internal { message: std::borrow::Cow::Borrowed(message), context: None }
                }
            }

            #(#cfgs)*
            impl From<String> for #name {
                #[inline]
                fn from(message: String) -> Self {
                    Self::Internal { message: std::borrow::Cow::Owned(message), context: None }
                }
            }
        }
    }
}

fn parse_variant(variant: &Variant) -> syn::Result<ErrorVariant<'_>> {
    let Fields::Named(fields) = &variant.fields else {
        return Err(syn::Error::new_spanned(
            variant,
            "mosaic_error variants must use named fields so source/context can be wired",
        ));
    };

    let mut contextual = false;
    let mut source = None;

    for field in &fields.named {
        let Some(ident) = &field.ident else { continue };
        if ident == "context" {
            if !is_context_type(&field.ty) {
                return Err(syn::Error::new_spanned(
                    &field.ty,
                    "context field must be Option<Cow<'static, str>>",
                ));
            }
            contextual = true;
        } else if source.is_none() && is_source(ident, field) {
            source = Some((ident, &field.ty));
        }
    }

    Ok(ErrorVariant {
        ident: &variant.ident,
        source,
        contextual,
        cfgs: variant.attrs.iter().filter(|attr| attr.path().is_ident("cfg")).collect(),
    })
}

fn is_source(ident: &Ident, field: &Field) -> bool {
    ident == "source"
        || field.attrs.iter().any(|attr| attr.path().is_ident("source") || attr.path().is_ident("from"))
}

fn is_context_type(ty: &Type) -> bool {
    let rendered: String =
        ty.to_token_stream().to_string().chars().filter(|c| !c.is_whitespace()).collect();

    let inner = ["Option<", "std::option::Option<", "::std::option::Option<", "core::option::Option<"]
        .iter()
        .find_map(|prefix| rendered.strip_prefix(prefix))
        .and_then(|rest| rest.strip_suffix('>'));

    inner.is_some_and(|inner| CONTEXT_TYPES.contains(&inner))
}

fn derived_traits(attrs: &[Attribute]) -> FxHashSet<String> {
    let mut traits = FxHashSet::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("derive")) {
        let _ = attr.parse_nested_meta(|meta| {
            if let Some(segment) = meta.path.segments.last() {
                traits.insert(segment.ident.to_string());
            }
            Ok(())
        });
    }
    traits
}
