use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::core::{Document, Result, StoreError};

/// Per-type mapping rules, built once at registration time.
///
/// Replaces runtime attribute inspection: every entity type states its
/// collection routing explicitly through this descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    /// Unique type name, also the shared-collection discriminator.
    pub type_name: &'static str,
    /// Collection the entities of this type live in.
    pub collection_name: String,
    /// Service-side partition key path (e.g. "/region"), if partitioned.
    pub partition_key_path: Option<String>,
    /// Whether the collection co-locates multiple entity types.
    pub shared_collection: bool,
}

impl EntityDescriptor {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            collection_name: type_name.to_lowercase(),
            partition_key_path: None,
            shared_collection: false,
        }
    }

    /// Overrides the collection name (defaults to the lowercased type name).
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection_name = name.into();
        self
    }

    /// Declares the partition key path for this type's collection.
    pub fn partition_key_path(mut self, path: impl Into<String>) -> Self {
        self.partition_key_path = Some(path.into());
        self
    }

    /// Marks the collection as shared across entity types; documents are
    /// disambiguated by the type-name discriminator.
    pub fn shared(mut self) -> Self {
        self.shared_collection = true;
        self
    }
}

/// A record type that can be stored through a [`crate::DocumentStore`].
///
/// The descriptor is static per type; the instance accessors expose the
/// document id and partition-key value. The store never mutates an entity
/// except to populate a missing id through [`DocumentEntity::set_document_id`].
pub trait DocumentEntity: Serialize + DeserializeOwned + Send + Sync {
    /// The mapping rules for this type. Must be cheap; called per operation.
    fn descriptor() -> EntityDescriptor;

    /// Current document id, if the entity already has one.
    fn document_id(&self) -> Option<String>;

    /// Installs an auto-generated id on an entity that had none.
    fn set_document_id(&mut self, id: String);

    /// Partition-key value derived from the designated field, if any.
    fn partition_key(&self) -> Option<String> {
        None
    }
}

/// Returns the entity's id, generating and installing a fresh random one
/// if it is absent.
pub fn ensure_document_id<T: DocumentEntity>(entity: &mut T) -> String {
    match entity.document_id() {
        Some(id) if !id.is_empty() => id,
        _ => {
            let id = Uuid::new_v4().to_string();
            entity.set_document_id(id.clone());
            id
        }
    }
}

/// Serializes an entity into the wire-side [`Document`].
///
/// The entity must already carry an id; write paths call
/// [`ensure_document_id`] first.
pub fn to_document<T: DocumentEntity>(entity: &T) -> Result<Document> {
    let descriptor = T::descriptor();
    let id = entity
        .document_id()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| StoreError::MissingId(descriptor.type_name.to_string()))?;

    let body = serde_json::to_value(entity)?;
    if !body.is_object() {
        return Err(StoreError::InvalidBody(format!(
            "entity '{}' did not serialize to an object",
            descriptor.type_name
        )));
    }

    let mut doc = Document::new(id, body);
    if let Some(key) = entity.partition_key() {
        doc = doc.with_partition_key(key);
    }
    if descriptor.shared_collection {
        doc = doc.with_entity_type(descriptor.type_name);
    }
    Ok(doc)
}

/// Deserializes a document body back into the entity type.
pub fn from_document<T: DocumentEntity>(doc: Document) -> Result<T> {
    Ok(serde_json::from_value(doc.body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Reading {
        id: Option<String>,
        sensor: String,
        value: f64,
    }

    impl DocumentEntity for Reading {
        fn descriptor() -> EntityDescriptor {
            EntityDescriptor::new("Reading")
                .collection("telemetry")
                .partition_key_path("/sensor")
                .shared()
        }

        fn document_id(&self) -> Option<String> {
            self.id.clone()
        }

        fn set_document_id(&mut self, id: String) {
            self.id = Some(id);
        }

        fn partition_key(&self) -> Option<String> {
            Some(self.sensor.clone())
        }
    }

    #[test]
    fn test_descriptor_builder() {
        let descriptor = Reading::descriptor();
        assert_eq!(descriptor.type_name, "Reading");
        assert_eq!(descriptor.collection_name, "telemetry");
        assert_eq!(descriptor.partition_key_path.as_deref(), Some("/sensor"));
        assert!(descriptor.shared_collection);
    }

    #[test]
    fn test_ensure_document_id_generates_once() {
        let mut reading = Reading {
            id: None,
            sensor: "s1".to_string(),
            value: 1.5,
        };
        let id = ensure_document_id(&mut reading);
        assert!(!id.is_empty());
        // Second call must keep the generated id stable.
        assert_eq!(ensure_document_id(&mut reading), id);
    }

    #[test]
    fn test_to_document_requires_id() {
        let reading = Reading {
            id: None,
            sensor: "s1".to_string(),
            value: 1.5,
        };
        assert!(matches!(
            to_document(&reading),
            Err(StoreError::MissingId(_))
        ));
    }

    #[test]
    fn test_document_round_trip_carries_routing() {
        let mut reading = Reading {
            id: None,
            sensor: "s7".to_string(),
            value: 2.25,
        };
        let id = ensure_document_id(&mut reading);

        let doc = to_document(&reading).unwrap();
        assert_eq!(doc.id, id);
        assert_eq!(doc.partition_key.as_deref(), Some("s7"));
        assert_eq!(doc.entity_type.as_deref(), Some("Reading"));

        let back: Reading = from_document(doc).unwrap();
        assert_eq!(back, reading);
    }
}
