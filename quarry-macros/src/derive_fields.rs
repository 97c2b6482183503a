use crate::{
    prelude::*,
    utils::{build_fields_enum, extract_named_fields, extract_serde_rename, field_lit},
};

pub fn derive_fields(item: TokenStream) -> Result<TokenStream> {
    let input = parse2::<DeriveInput>(item)?;

    let fields_named = extract_named_fields(input.span(), input.data)?;

    let fields = fields_named
        .named
        .iter()
        .map(|field| {
            extract!(&field.ident, Some(ident), "expected named field");
            let rename = extract_serde_rename(field)?;
            Ok((ident.clone(), field_lit(ident, rename.as_deref())))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(build(&input.vis, &input.ident, &fields))
}

fn build(vis: &Visibility, ident: &Ident, fields: &[(Ident, LitStr)]) -> TokenStream {
    let mod_ident = Ident::new(&ident.to_string().to_snake_case(), Span::call_site());

    let fields_enum = build_fields_enum(
        fields.iter().map(|field| &field.0),
        fields.iter().map(|field| &field.1),
    );

    quote! {
        #vis mod #mod_ident {
            #fields_enum
        }
    }
}
