#![warn(clippy::pedantic)]

mod derive_entity;
mod derive_fields;
mod prelude;
mod utils;

fn expand<F: FnOnce(proc_macro2::TokenStream) -> syn::Result<proc_macro2::TokenStream>>(
    fun: F,
    input: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    fun(input.into())
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Implements `quarry::Entity`, and `quarry::Identifiable` when the struct
/// has an identity field.
///
/// The identity field is the field named `id`, or the one named by
/// `#[entity(id = "...")]`. It must be serialized as `_id` and have an
/// `Option` type whose inner type can be built from an `ObjectId`.
#[proc_macro_derive(Entity, attributes(entity))]
pub fn entity(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    expand(derive_entity::derive_entity, input)
}

/// Generates a `Fields` enum, displayed as serialized field names, in a
/// module named after the struct.
#[proc_macro_derive(Fields)]
pub fn fields(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    expand(derive_fields::derive_fields, input)
}
