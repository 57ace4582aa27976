use serde::de::DeserializeOwned;
use serde::Serialize;

/// A record that can be stored in a keyed collection.
///
/// The key is the record's uniqueness constraint: two records with the same
/// key are the same fact. Composite keys join their segments with `/`, which
/// identifier types guarantee never appears inside a segment.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name of the collection holding records of this type.
    const COLLECTION: &'static str;

    /// Storage key of this record.
    fn key(&self) -> String;
}
