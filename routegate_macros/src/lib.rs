//! Procedural macros for routegate.
//!
//! `#[handler]` leaves the annotated function untouched and emits a sibling
//! `&'static str` constant holding the function body as source text, so the
//! documentation engine can recover the literal response shape of handlers
//! that declare no response schema.

use proc_macro::TokenStream;
use quote::{format_ident, quote, ToTokens};
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input, Ident, ItemFn, LitStr, Result as SynResult, Token,
};

/// Optional `source = "CONST_NAME"` override for the generated constant.
struct HandlerArgs {
    source_name: Option<Ident>,
}

impl Parse for HandlerArgs {
    fn parse(input: ParseStream) -> SynResult<Self> {
        if input.is_empty() {
            return Ok(HandlerArgs { source_name: None });
        }
        let key: Ident = input.parse()?;
        if key != "source" {
            return Err(syn::Error::new(
                key.span(),
                format!("unexpected argument {}, expected `source`", key),
            ));
        }
        input.parse::<Token![=]>()?;
        let lit: LitStr = input.parse()?;
        Ok(HandlerArgs {
            source_name: Some(Ident::new(&lit.value(), lit.span())),
        })
    }
}

fn source_const_name(fn_name: &Ident) -> Ident {
    format_ident!("{}_SOURCE", fn_name.to_string().to_uppercase())
}

/// Capture a handler's body as source text.
///
/// ```rust,ignore
/// #[handler]
/// fn get_profile(ctx: RequestContext) -> HandlerResult {
///     return Ok(BaseResponse::ok().with_data(json!({ "name": "ada" })));
/// }
///
/// // expands to the fn above plus
/// // pub const GET_PROFILE_SOURCE: &str = "{ return Ok (...) ; }";
/// ```
#[proc_macro_attribute]
pub fn handler(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as HandlerArgs);
    let input = parse_macro_input!(item as ItemFn);
    let fn_vis = &input.vis;
    let const_name = args
        .source_name
        .unwrap_or_else(|| source_const_name(&input.sig.ident));
    let source = input.block.to_token_stream().to_string();

    let expanded = quote! {
        #input

        #[allow(dead_code)]
        #fn_vis const #const_name: &str = #source;
    };
    TokenStream::from(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proc_macro2::Span;

    #[test]
    fn const_name_is_upper_snake() {
        let name = Ident::new("get_profile", Span::call_site());
        assert_eq!(source_const_name(&name).to_string(), "GET_PROFILE_SOURCE");
    }
}
