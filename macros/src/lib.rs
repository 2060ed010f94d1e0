//! Derive macro generating the `as_str`/`Display`/`FromStr` trio hand-written
//! across `arbihawk-markets`/`arbihawk-instrument` for simple, unit-variant
//! enums keyed by their snake_case name (e.g. `TradeType::StopLoss` ↔
//! `"stop_loss"`). Not applied to every enum in the workspace — several
//! carry naming exceptions (`TradeType::Buy` vs a `BetResult` variant named
//! differently from its wire string) that read more clearly hand-written.

use convert_case::{Case, Casing};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, Data, DeriveInput, Fields};

#[proc_macro_derive(AsStrEnum)]
pub fn as_str_enum_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    match expand(ast) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(ast: DeriveInput) -> syn::Result<TokenStream2> {
    let name = &ast.ident;
    let Data::Enum(data) = &ast.data else {
        return Err(syn::Error::new_spanned(&ast, "AsStrEnum only supports enums"));
    };

    let mut variant_idents = Vec::with_capacity(data.variants.len());
    let mut variant_strs = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(variant, "AsStrEnum only supports unit variants"));
        }
        variant_strs.push(variant.ident.to_string().to_case(Case::Snake));
        variant_idents.push(&variant.ident);
    }

    let error_name = format_ident!("Unknown{name}");
    let error_label = name.to_string().to_case(Case::Lower).replace('_', " ");
    let error_message = format!("unknown {error_label}: {{0}}");

    Ok(quote! {
        impl #name {
            /// Generated by `#[derive(AsStrEnum)]`.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    #(Self::#variant_idents => #variant_strs,)*
                }
            }
        }

        impl ::std::fmt::Display for #name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        /// Generated by `#[derive(AsStrEnum)]`.
        #[derive(Debug, thiserror::Error)]
        #[error(#error_message)]
        pub struct #error_name(pub String);

        impl ::std::str::FromStr for #name {
            type Err = #error_name;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s {
                    #(#variant_strs => Ok(Self::#variant_idents),)*
                    other => Err(#error_name(other.to_string())),
                }
            }
        }
    })
}
