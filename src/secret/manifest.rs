//! YAML rendering of a secret record as a `v1/Secret` manifest.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

use super::{PersistError, SecretRecord};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Manifest<'a> {
    api_version: &'static str,
    kind: &'static str,
    metadata: Metadata<'a>,
    #[serde(rename = "type")]
    secret_type: &'static str,
    data: BTreeMap<&'a str, String>,
}

#[derive(Serialize)]
struct Metadata<'a> {
    name: &'a str,
    namespace: &'a str,
}

/// Render `record` as an `Opaque` secret with base64 `data` fields in
/// sorted order. Identical records render to identical bytes.
pub fn render(record: &SecretRecord) -> Result<String, PersistError> {
    let manifest = Manifest {
        api_version: "v1",
        kind: "Secret",
        metadata: Metadata {
            name: &record.name,
            namespace: &record.namespace,
        },
        secret_type: "Opaque",
        data: record
            .data
            .iter()
            .map(|(field, bytes)| (field.as_str(), STANDARD.encode(bytes)))
            .collect(),
    };
    serde_yaml_ng::to_string(&manifest).map_err(|e| PersistError::Serialize(e.to_string()))
}
