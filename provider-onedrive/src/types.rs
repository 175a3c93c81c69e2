//! Microsoft Graph response types

use serde::Deserialize;

/// Subset of the Graph `driveItem` resource used by the connector
///
/// See: https://learn.microsoft.com/graph/api/resources/driveitem
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    /// Item ID
    pub id: String,

    /// Entity tag for the entire item (metadata + content)
    #[serde(rename = "eTag", default)]
    pub e_tag: Option<String>,
}

/// Graph error envelope: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
pub struct GraphErrorResponse {
    pub error: GraphError,
}

#[derive(Debug, Deserialize)]
pub struct GraphError {
    #[serde(default)]
    pub code: String,

    #[serde(default)]
    pub message: String,
}
