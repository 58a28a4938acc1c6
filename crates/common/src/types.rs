use serde::{Deserialize, Serialize};

/// Notification kind registered for every alert sent by this tool.
pub const SERVICE_ALERTS_KIND_ID: &str = "service-alerts";

/// Body of `POST /spaces/{guid}` on the notification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub kind_id: String,
    pub subject: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

/// `GET /v2/info` on the platform API. Only the token endpoint is used.
#[derive(Debug, Clone, Deserialize)]
pub struct InfoResponse {
    pub token_endpoint: String,
}

/// Successful response from the token issuer.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// A page of platform resources as returned by filtered v2 queries.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceList {
    pub total_results: u64,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    pub metadata: ResourceMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceMetadata {
    pub guid: String,
}
