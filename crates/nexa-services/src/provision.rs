//! Bucket provisioning: make sure the bucket and its baseline folders exist.

use bytes::Bytes;
use tracing::info;

use crate::storage::{ObjectStore, StorageError};

/// Top-level folders every deployment needs.
pub const REQUIRED_FOLDERS: &[&str] = &["profile_pictures", "projects"];

/// What a provisioning run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    pub bucket: String,
    pub bucket_created: bool,
    /// Folder marker keys created, each ending in `/`.
    pub folders_created: Vec<String>,
}

impl ProvisionReport {
    pub fn changed(&self) -> bool {
        self.bucket_created || !self.folders_created.is_empty()
    }
}

/// Create the bucket if no bucket of that name is listed, then put a
/// zero-byte marker for every required folder missing from the top-level
/// prefixes. Running it twice is a no-op the second time.
pub async fn provision(
    store: &ObjectStore,
    bucket: &str,
    folders: &[&str],
) -> Result<ProvisionReport, StorageError> {
    let mut report = ProvisionReport {
        bucket: bucket.to_string(),
        ..Default::default()
    };

    let buckets = store.list_buckets().await?;
    if buckets.iter().any(|b| b == bucket) {
        info!("Bucket already exists: {bucket}");
    } else {
        store.create_bucket(bucket).await?;
        report.bucket_created = true;
        info!("Bucket created: {bucket}");
    }

    let existing = store.list_prefixes(bucket, "", '/').await?;
    for folder in folders {
        let key = if folder.ends_with('/') {
            folder.to_string()
        } else {
            format!("{folder}/")
        };
        if existing.contains(&key) {
            continue;
        }
        store.put_object(bucket, &key, Bytes::new()).await?;
        info!("Folder created: {key}");
        report.folders_created.push(key);
    }

    if report.folders_created.is_empty() {
        info!("All required folders already exist.");
    }
    Ok(report)
}
