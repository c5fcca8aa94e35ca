use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::audit::AuditEntry;

/// Wire representation of a single node. `content` is Base64 on the file
/// variant; folders carry a name-keyed `children` map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeDoc {
    File {
        name: String,
        created_at: f64,
        modified_at: f64,
        #[serde(with = "base64_bytes")]
        content: Vec<u8>,
    },
    Folder {
        name: String,
        created_at: f64,
        modified_at: f64,
        children: BTreeMap<String, NodeDoc>,
    },
}

impl NodeDoc {
    pub fn name(&self) -> &str {
        match self {
            NodeDoc::File { name, .. } => name,
            NodeDoc::Folder { name, .. } => name,
        }
    }
}

mod base64_bytes {
    use super::{BASE64, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        BASE64.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}

/// Top-level payload that is JSON-serialized, encrypted, and enveloped:
/// `{ "root": <folder-node>, "audit": [<entry>...], "settings": {} }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub root: NodeDoc,
    pub audit: Vec<AuditEntry>,
    /// Reserved for forward compatibility; retained verbatim on round-trip.
    #[serde(default = "default_settings")]
    pub settings: serde_json::Value,
}

fn default_settings() -> serde_json::Value {
    serde_json::json!({})
}
