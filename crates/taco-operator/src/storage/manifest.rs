//! YAML manifest loading
//!
//! A manifest file holds one or more `---` separated documents, each either
//! a `TacoOrder` or a `Secret`:
//!
//! ```yaml
//! kind: Secret
//! metadata: { name: pay1 }
//! stringData: { cardNumber: "4111111111111111", cardExpiry: "12/30", cardCvv: "123" }
//! ---
//! kind: TacoOrder
//! metadata: { name: lunch }
//! spec: { quantity: 2, variety: carnitas, paymentSecretName: pay1, addressSecretName: addr1 }
//! ```

use super::traits::{OrderStorage, SecretStorage, Storage};
use crate::error::{OperatorError, OperatorResult, StorageError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use taco_types::{ObjectMeta, Secret, TacoOrder, TacoOrderSpec};

/// One manifest document
#[derive(Debug, Deserialize)]
#[serde(tag = "kind")]
pub enum Manifest {
    TacoOrder(OrderManifest),
    Secret(SecretManifest),
}

#[derive(Debug, Deserialize)]
pub struct OrderManifest {
    pub metadata: ObjectMeta,
    pub spec: TacoOrderSpec,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretManifest {
    pub metadata: ObjectMeta,

    /// Base64 encoded values
    #[serde(default)]
    pub data: BTreeMap<String, String>,

    /// Plain values, applied after `data`
    #[serde(default)]
    pub string_data: BTreeMap<String, String>,
}

impl std::fmt::Debug for SecretManifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretManifest")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl SecretManifest {
    fn into_secret(self) -> OperatorResult<Secret> {
        let mut secret = Secret::new(self.metadata);
        for (key, value) in self.data {
            let bytes = STANDARD.decode(value.trim()).map_err(|e| {
                OperatorError::Manifest(format!(
                    "secret {} key '{}' is not valid base64: {}",
                    secret.key(),
                    key,
                    e
                ))
            })?;
            secret.data.insert(key, bytes);
        }
        for (key, value) in self.string_data {
            secret.data.insert(key, value.into_bytes());
        }
        Ok(secret)
    }
}

/// What a manifest load applied
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ManifestSummary {
    pub orders: usize,
    pub secrets: usize,
    pub skipped: usize,
}

/// Parse every document in a YAML string
pub fn parse_manifests(text: &str) -> OperatorResult<Vec<Manifest>> {
    let mut manifests = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = serde_yaml::Value::deserialize(document)
            .map_err(|e| OperatorError::Manifest(e.to_string()))?;
        if value.is_null() {
            continue;
        }
        let manifest =
            serde_yaml::from_value(value).map_err(|e| OperatorError::Manifest(e.to_string()))?;
        manifests.push(manifest);
    }
    Ok(manifests)
}

/// Load a manifest file, or every `.yaml`/`.yml` file of a directory, into storage
///
/// Secrets are applied before orders so that a freshly created order never
/// races its own credentials. Orders that already exist are left untouched.
pub async fn load_manifests(path: &Path, storage: &dyn Storage) -> OperatorResult<ManifestSummary> {
    let mut manifests = Vec::new();
    for file in manifest_files(path)? {
        let text = tokio::fs::read_to_string(&file).await?;
        let parsed = parse_manifests(&text).map_err(|e| match e {
            OperatorError::Manifest(msg) => {
                OperatorError::Manifest(format!("{}: {}", file.display(), msg))
            }
            other => other,
        })?;
        manifests.extend(parsed);
    }

    let (secrets, orders): (Vec<_>, Vec<_>) = manifests
        .into_iter()
        .partition(|m| matches!(m, Manifest::Secret(_)));

    let mut summary = ManifestSummary::default();
    for manifest in secrets.into_iter().chain(orders) {
        match manifest {
            Manifest::Secret(secret) => {
                storage.upsert_secret(secret.into_secret()?).await?;
                summary.secrets += 1;
            }
            Manifest::TacoOrder(order) => {
                let order = TacoOrder::new(order.metadata, order.spec);
                let key = order.key();
                match storage.create_order(order).await {
                    Ok(_) => summary.orders += 1,
                    Err(StorageError::AlreadyExists(_)) => {
                        tracing::warn!(order = %key, "Order already exists, skipping manifest");
                        summary.skipped += 1;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }

    tracing::info!(
        path = %path.display(),
        orders = summary.orders,
        secrets = summary.secrets,
        skipped = summary.skipped,
        "Loaded manifests"
    );

    Ok(summary)
}

fn manifest_files(path: &Path) -> OperatorResult<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let file = entry?.path();
        let is_yaml = file
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext == "yaml" || ext == "yml");
        if file.is_file() && is_yaml {
            files.push(file);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use taco_types::{ObjectKey, PaymentCard};

    const MANIFEST: &str = r#"
kind: TacoOrder
apiVersion: tacos.example.com/v1alpha1
metadata:
  name: lunch
  namespace: kitchen
spec:
  quantity: 2
  variety: carnitas
  paymentSecretName: pay1
  addressSecretName: addr1
---
kind: Secret
metadata:
  name: pay1
  namespace: kitchen
data:
  cardNumber: NDExMTExMTExMTExMTExMQ==
stringData:
  cardExpiry: "12/30"
  cardCvv: "123"
---
"#;

    #[test]
    fn test_parse_multi_document() {
        let manifests = parse_manifests(MANIFEST).unwrap();
        assert_eq!(manifests.len(), 2);
        match &manifests[0] {
            Manifest::TacoOrder(order) => {
                assert_eq!(order.metadata.namespace, "kitchen");
                assert_eq!(order.spec.quantity, 2);
            }
            other => panic!("unexpected manifest: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let err = parse_manifests("kind: Burrito\nmetadata: { name: x }\n").unwrap_err();
        assert!(matches!(err, OperatorError::Manifest(_)));
    }

    #[tokio::test]
    async fn test_load_file_into_storage() {
        let dir = std::env::temp_dir().join(format!("taco-manifests-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("lunch.yaml"), MANIFEST).unwrap();
        std::fs::write(dir.join("notes.txt"), "not a manifest").unwrap();

        let storage = InMemoryStorage::new();
        let summary = load_manifests(&dir, &storage).await.unwrap();
        assert_eq!(
            summary,
            ManifestSummary {
                orders: 1,
                secrets: 1,
                skipped: 0
            }
        );

        let secret = storage
            .get_secret(&ObjectKey::new("kitchen", "pay1"))
            .await
            .unwrap()
            .unwrap();
        let card = PaymentCard::from_secret(&secret).unwrap();
        assert_eq!(card.card_number, "4111111111111111");
        assert_eq!(card.card_expiry, "12/30");

        // Loading again leaves the existing order alone.
        let summary = load_manifests(&dir, &storage).await.unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(storage.list_orders().await.unwrap().len(), 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
