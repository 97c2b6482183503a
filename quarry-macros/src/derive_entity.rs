use crate::{
    prelude::*,
    utils::{extract_named_fields, extract_serde_rename},
};

#[derive(FromAttributes)]
#[darling(attributes(entity))]
struct Attributes {
    #[darling(default)]
    id: Option<Ident>,
}

pub fn derive_entity(item: TokenStream) -> Result<TokenStream> {
    let input = parse2::<DeriveInput>(item)?;

    let attributes = Attributes::from_attributes(&input.attrs)?;

    let fields_named = extract_named_fields(input.span(), input.data.clone())?;

    let id_ident = attributes
        .id
        .clone()
        .unwrap_or_else(|| Ident::new("id", Span::call_site()));

    let id_field = fields_named
        .named
        .iter()
        .find(|field| field.ident.as_ref() == Some(&id_ident));

    let identity = match id_field {
        Some(field) => Some(identity_field(field)?),
        None if attributes.id.is_some() => {
            return Err(Error::new_spanned(&id_ident, "unknown field"));
        }
        None => None,
    };

    build(&input, identity.as_ref())
}

struct IdentityConfig {
    ident: Ident,
}

fn identity_field(field: &Field) -> Result<IdentityConfig> {
    let rename = extract_serde_rename(field)?;

    if rename.as_deref() != Some("_id") {
        return Err(Error::new_spanned(
            field,
            "id field must have `#[serde(rename = \"_id\")]`",
        ));
    }

    if option_inner(&field.ty).is_none() {
        return Err(Error::new_spanned(
            &field.ty,
            "id field must be an `Option`, `None` meaning no id has been assigned yet",
        ));
    }

    extract!(&field.ident, Some(ident), "expected named field");

    Ok(IdentityConfig {
        ident: ident.clone(),
    })
}

fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };

    if type_path.qself.is_some() {
        return None;
    }

    let segment = type_path.path.segments.last()?;

    if segment.ident != "Option" {
        return None;
    }

    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };

    match arguments.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

fn build(input: &DeriveInput, identity: Option<&IdentityConfig>) -> Result<TokenStream> {
    let krate = krate()?;

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Some(identity) = identity else {
        return Ok(quote! {
            impl #impl_generics #krate::Entity for #ident #ty_generics #where_clause {}
        });
    };

    let id_ident = &identity.ident;

    Ok(quote! {
        impl #impl_generics #krate::Entity for #ident #ty_generics #where_clause {
            fn identity(&self) -> ::std::option::Option<&dyn #krate::Identifiable> {
                ::std::option::Option::Some(self)
            }

            fn identity_mut(&mut self) -> ::std::option::Option<&mut dyn #krate::Identifiable> {
                ::std::option::Option::Some(self)
            }
        }

        impl #impl_generics #krate::Identifiable for #ident #ty_generics #where_clause {
            fn document_id(&self) -> ::std::option::Option<#krate::bson::Bson> {
                ::std::option::Option::and_then(
                    ::std::option::Option::as_ref(&self.#id_ident),
                    |id| ::std::result::Result::ok(#krate::bson::to_bson(id)),
                )
            }

            fn generate_id_if_absent(&mut self) {
                if ::std::option::Option::is_none(&self.#id_ident) {
                    self.#id_ident = ::std::option::Option::Some(
                        ::std::convert::From::from(#krate::bson::oid::ObjectId::new())
                    );
                }
            }
        }
    })
}
