pub(crate) use crate::utils::{extract, krate};
pub use darling::FromAttributes;
pub use heck::{ToSnakeCase, ToUpperCamelCase};
pub use itertools::Itertools;
pub use proc_macro2::{Span, TokenStream};
pub use quote::quote;
pub use std::borrow::Cow;
pub use syn::{
    Data, DeriveInput, Error, Field, Fields, FieldsNamed, GenericArgument, Ident, LitStr,
    PathArguments, Result, Type, Visibility, parse2, spanned::Spanned,
};
