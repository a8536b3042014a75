use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Well-known custom-metadata keys, mirroring the standard property set the
/// original implementation special-cases when flattening custom metadata.
pub const ETAG: &str = "ETag";
pub const LAST_MODIFIED: &str = "LastModified";
pub const SOURCE_OBJECT_ID: &str = "SourceObjectId";

/// `(provider, namespace, name)` bucket identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BucketId {
    pub provider: String,
    pub namespace: String,
    pub name: String,
}

impl BucketId {
    pub fn new(provider: impl Into<String>, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.provider, self.namespace, self.name)
    }
}

/// UTF-8, slash-delimited, case-sensitive object key.
pub type ObjectKey = String;

/// An opaque peer/target identifier within the cluster.
pub type PeerId = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CksumType {
    None,
    Md5,
    Sha256,
    Xxh3,
}

impl Default for CksumType {
    fn default() -> Self {
        CksumType::None
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
    pub algo: CksumType,
    pub value: String,
}

impl Digest {
    pub fn none() -> Self {
        Self {
            algo: CksumType::None,
            value: String::new(),
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self.algo, CksumType::None) && !self.value.is_empty()
    }
}

/// Per-object custom key-value metadata (notably ETag, LastModified,
/// source-object-id). A thin newtype over a map so call sites read as
/// domain vocabulary rather than `HashMap<String, String>`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomMeta(pub HashMap<String, String>);

impl CustomMeta {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }
}
