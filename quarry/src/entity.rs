use dashmap::DashMap;
use mongodb::bson::{Bson, Document, doc, oid::ObjectId};
use serde::{Serialize, de::DeserializeOwned};
use std::{fmt::Display, sync::LazyLock};

/// A type stored in and read back from a collection.
///
/// Types with an `_id` implement [`Identifiable`] and expose it through
/// [`Entity::identity`] and [`Entity::identity_mut`]. Everything else keeps
/// the defaults, which makes identity-dependent operations such as
/// [`View::save`](crate::View::save) fail with
/// [`Error::UnsupportedOperation`](crate::Error::UnsupportedOperation).
///
/// Usually derived:
///
/// ```ignore
/// #[derive(Serialize, Deserialize, Entity)]
/// struct Order {
///     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
///     id: Option<ObjectId>,
///     status: String,
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn identity(&self) -> Option<&dyn Identifiable> {
        None
    }

    fn identity_mut(&mut self) -> Option<&mut dyn Identifiable> {
        None
    }
}

pub trait Identifiable {
    fn document_id(&self) -> Option<Bson>;

    fn generate_id_if_absent(&mut self);

    fn has_id(&self) -> bool {
        self.document_id().is_some()
    }
}

impl Entity for Document {
    fn identity(&self) -> Option<&dyn Identifiable> {
        Some(self)
    }

    fn identity_mut(&mut self) -> Option<&mut dyn Identifiable> {
        Some(self)
    }
}

impl Identifiable for Document {
    fn document_id(&self) -> Option<Bson> {
        self.get("_id").cloned()
    }

    fn generate_id_if_absent(&mut self) {
        if !self.contains_key("_id") {
            self.insert("_id", ObjectId::new());
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// Builds a sort document, keeping the order of `fields`.
pub fn sort_document<F: Display>(fields: impl IntoIterator<Item = (F, Order)>) -> Document {
    fields
        .into_iter()
        .map(|(field, order)| {
            (
                field.to_string(),
                Bson::Int32(match order {
                    Order::Asc => 1,
                    Order::Desc => -1,
                }),
            )
        })
        .collect()
}

/// Builds an inclusion projection for `fields`.
///
/// `_id` is excluded unless listed. Documents are cached per field list.
pub fn projection_document(fields: &'static [&'static str]) -> Document {
    static DOCUMENTS: LazyLock<DashMap<&'static [&'static str], Document>> =
        LazyLock::new(DashMap::new);

    if let Some(document) = DOCUMENTS.get(fields) {
        return document.clone();
    }

    let mut has_id = false;
    let mut document = doc! {};

    for field in fields {
        if *field == "_id" {
            has_id = true;
        }

        document.insert(*field, 1);
    }

    if !has_id {
        document.insert("_id", 0);
    }

    DOCUMENTS.insert(fields, document.clone());
    document
}
