use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named, versioned bundle of reviewed documents.
///
/// Packages are immutable. Packaging the same product and version again
/// creates a new package over whatever documents are completed at that time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LicensingPackage {
    pub id: i64,
    pub product_name: String,
    pub version: String,
    /// Included documents, in bundle order.
    pub document_ids: Vec<i64>,
    /// Directory the bundle was written to. `None` until the bundle exists on disk.
    pub artifact_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a licensing package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePackageInput {
    pub product_name: String,
    pub version: String,
    /// Document ids to place first, in this order. Remaining completed
    /// documents follow in creation order.
    #[serde(default)]
    pub manifest: Option<Vec<i64>>,
}
