use crate::prelude::*;
use proc_macro_crate::{FoundCrate, crate_name};

macro_rules! extract {
    ($val:expr, $pat:pat, $error_message: expr) => {
        let $pat = $val else {
            return Err(Error::new_spanned($val, $error_message));
        };
    };
}

pub(crate) use extract;

pub fn extract_named_fields(span: Span, data: Data) -> Result<FieldsNamed> {
    let Data::Struct(data_struct) = data else {
        return Err(Error::new(span, "expected struct"));
    };

    extract!(
        data_struct.fields,
        Fields::Named(named_fields),
        "expected named fields"
    );

    Ok(named_fields)
}

/// The `rename` of a field's `#[serde(...)]` attributes, ignoring every
/// other serde option.
pub fn extract_serde_rename(field: &Field) -> Result<Option<String>> {
    let mut rename = None;

    for attribute in &field.attrs {
        if !attribute.path().is_ident("serde") {
            continue;
        }

        attribute.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                rename = Some(value.value());
            } else if meta.input.peek(syn::Token![=]) {
                meta.value()?.parse::<syn::Expr>()?;
            } else if meta.input.peek(syn::token::Paren) {
                meta.parse_nested_meta(|nested| {
                    if nested.input.peek(syn::Token![=]) {
                        nested.value()?.parse::<syn::Expr>()?;
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })?;
    }

    Ok(rename)
}

/// The name a field is stored under.
pub fn field_lit(ident: &Ident, rename: Option<&str>) -> LitStr {
    LitStr::new(
        &rename.map_or_else(|| Cow::Owned(ident.to_string()), Cow::Borrowed),
        ident.span(),
    )
}

pub fn build_fields_enum<'a>(
    field_idents: impl Iterator<Item = &'a Ident>,
    field_lits: impl Iterator<Item = &'a LitStr>,
) -> TokenStream {
    let field_idents_upper_camel_case = field_idents
        .map(|ident| Ident::new(&ident.to_string().to_upper_camel_case(), Span::call_site()))
        .collect_vec();

    quote! {
        #[derive(
            ::std::fmt::Debug,
            ::std::clone::Clone,
            ::std::marker::Copy,
            ::std::cmp::PartialEq,
            ::std::cmp::Eq,
            ::std::hash::Hash,
        )]
        pub enum Fields {
            #( #field_idents_upper_camel_case ),*
        }

        impl Fields {
            pub const fn as_str(self) -> &'static str {
                match self {
                    #(
                        Self::#field_idents_upper_camel_case => #field_lits
                    ),*
                }
            }
        }

        impl ::std::fmt::Display for Fields {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::convert::From<Fields> for ::std::string::String {
            fn from(value: Fields) -> Self {
                ::std::string::ToString::to_string(&value)
            }
        }
    }
}

pub fn krate() -> Result<TokenStream> {
    match crate_name("quarry") {
        Ok(FoundCrate::Itself) => Ok(quote! { ::quarry }),
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            Ok(quote! { ::#ident })
        }
        Err(error) => Err(Error::new(Span::call_site(), error.to_string())),
    }
}
