//! Microsoft Graph connector implementation
//!
//! Implements the `BlobStore` trait for OneDrive items addressed by
//! drive-relative path or by item id.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::storage::{BlobHandle, BlobStore};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::OneDriveError;
use crate::types::{DriveItem, GraphErrorResponse};

/// Microsoft Graph API base URL
const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Fields to request for item metadata
const ITEM_SELECT: &str = "id,eTag";

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Microsoft Graph connector
///
/// # Example
///
/// ```ignore
/// use provider_onedrive::OneDriveConnector;
/// use bridge_traits::storage::BlobStore;
///
/// let connector = OneDriveConnector::new(http_client);
/// let handle = connector.lookup("Documents/calendar-events.json", token).await?;
/// ```
pub struct OneDriveConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// Graph endpoint, without trailing slash
    base_url: String,

    timeout: Duration,
}

impl OneDriveConnector {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            base_url: GRAPH_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Point the connector at a different Graph endpoint (national clouds, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Percent-encode each segment of a drive-relative path
    fn encode_path(path: &str) -> String {
        path.trim_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn path_url(&self, path: &str) -> String {
        format!(
            "{}/me/drive/root:/{}",
            self.base_url,
            Self::encode_path(path)
        )
    }

    fn item_url(&self, id: &str) -> String {
        format!(
            "{}/me/drive/items/{}",
            self.base_url,
            urlencoding::encode(id)
        )
    }

    fn request(&self, method: HttpMethod, url: String, token: &str) -> HttpRequest {
        HttpRequest::new(method, url)
            .bearer_token(token)
            .header("Accept", "application/json")
            .timeout(self.timeout)
    }

    fn json_body(request: HttpRequest, content: Bytes) -> HttpRequest {
        request
            .header("Content-Type", "application/json")
            .body(content)
    }

    fn parse_item(response: &HttpResponse) -> std::result::Result<DriveItem, OneDriveError> {
        serde_json::from_slice(&response.body)
            .map_err(|e| OneDriveError::ParseError(format!("Failed to parse driveItem: {}", e)))
    }

    fn into_handle(item: DriveItem) -> BlobHandle {
        BlobHandle::new(item.id, item.e_tag)
    }

    /// Map a non-success Graph response onto a provider error
    fn classify(response: &HttpResponse, subject: &str, if_match: Option<&str>) -> OneDriveError {
        let status = response.status;
        let (code, message) = match serde_json::from_slice::<GraphErrorResponse>(&response.body) {
            Ok(parsed) => (parsed.error.code, parsed.error.message),
            Err(_) => (
                String::new(),
                String::from_utf8_lossy(&response.body).to_string(),
            ),
        };

        match status {
            401 | 403 => OneDriveError::AuthRequired {
                status_code: status,
            },
            404 => OneDriveError::NotFound(subject.to_string()),
            409 => OneDriveError::AlreadyExists(subject.to_string()),
            412 => OneDriveError::PreconditionFailed {
                expected: if_match.unwrap_or_default().to_string(),
            },
            429 => OneDriveError::Throttled {
                status_code: status,
            },
            500..=599 => OneDriveError::ServiceUnavailable {
                status_code: status,
            },
            _ => OneDriveError::ApiError {
                status_code: status,
                code,
                message,
            },
        }
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method;
        let response = self.http_client.execute(request).await?;
        debug!(?method, status = response.status, "Graph request completed");
        Ok(response)
    }
}

#[async_trait]
impl BlobStore for OneDriveConnector {
    #[instrument(skip(self, token))]
    async fn lookup(&self, path: &str, token: &str) -> Result<Option<BlobHandle>> {
        let url = format!("{}?$select={}", self.path_url(path), ITEM_SELECT);
        let response = self.send(self.request(HttpMethod::Get, url, token)).await?;

        match response.status {
            200 => {
                let item = Self::parse_item(&response)?;
                debug!(item_id = %item.id, "Resolved document by path");
                Ok(Some(Self::into_handle(item)))
            }
            404 => {
                debug!("No document at path");
                Ok(None)
            }
            _ => Err(Self::classify(&response, path, None).into()),
        }
    }

    #[instrument(skip(self, initial, token), fields(bytes = initial.len()))]
    async fn create(&self, path: &str, initial: Bytes, token: &str) -> Result<BlobHandle> {
        let url = format!(
            "{}:/content?@microsoft.graph.conflictBehavior=fail",
            self.path_url(path)
        );
        let request = Self::json_body(self.request(HttpMethod::Put, url, token), initial);
        let response = self.send(request).await?;

        if response.is_success() {
            let item = Self::parse_item(&response)?;
            info!(item_id = %item.id, "Created document");
            Ok(Self::into_handle(item))
        } else {
            Err(Self::classify(&response, path, None).into())
        }
    }

    #[instrument(skip(self, token))]
    async fn metadata(&self, id: &str, token: &str) -> Result<BlobHandle> {
        let url = format!("{}?$select={}", self.item_url(id), ITEM_SELECT);
        let response = self.send(self.request(HttpMethod::Get, url, token)).await?;

        if response.status == 200 {
            Ok(Self::into_handle(Self::parse_item(&response)?))
        } else {
            Err(Self::classify(&response, id, None).into())
        }
    }

    #[instrument(skip(self, token))]
    async fn read(&self, id: &str, token: &str) -> Result<Bytes> {
        let url = format!("{}/content", self.item_url(id));
        let response = self.send(self.request(HttpMethod::Get, url, token)).await?;

        if response.status == 200 {
            debug!(bytes = response.body.len(), "Downloaded document");
            Ok(response.body)
        } else {
            Err(Self::classify(&response, id, None).into())
        }
    }

    #[instrument(skip(self, content, token), fields(bytes = content.len()))]
    async fn write(
        &self,
        id: &str,
        content: Bytes,
        if_match: Option<&str>,
        token: &str,
    ) -> Result<BlobHandle> {
        let url = format!("{}/content", self.item_url(id));
        let mut request = Self::json_body(self.request(HttpMethod::Put, url, token), content);
        if let Some(version) = if_match {
            request = request.if_match(version);
        }

        let response = self.send(request).await?;

        if response.is_success() {
            let item = Self::parse_item(&response)?;
            info!(item_id = %item.id, "Uploaded document");
            Ok(Self::into_handle(item))
        } else {
            let error = Self::classify(&response, id, if_match);
            if matches!(error, OneDriveError::PreconditionFailed { .. }) {
                warn!("Document changed since it was read");
            }
            Err(error.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    const ITEM_JSON: &str = r#"{"id": "ITEM1", "eTag": "\"{E1},1\"", "name": "calendar-events.json"}"#;

    #[test]
    fn test_encode_path() {
        assert_eq!(
            OneDriveConnector::encode_path("Documents/calendar-events.json"),
            "Documents/calendar-events.json"
        );
        assert_eq!(
            OneDriveConnector::encode_path("/My Files/a#b.json"),
            "My%20Files/a%23b.json"
        );
    }

    #[tokio::test]
    async fn test_lookup_found() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.method, HttpMethod::Get);
            assert!(req
                .url
                .starts_with("https://graph.microsoft.com/v1.0/me/drive/root:/Documents/calendar-events.json"));
            assert_eq!(
                req.headers.get("Authorization"),
                Some(&"Bearer test_token".to_string())
            );
            Ok(response(200, ITEM_JSON))
        });

        let connector = OneDriveConnector::new(Arc::new(mock_http));
        let handle = connector
            .lookup("Documents/calendar-events.json", "test_token")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(handle.id, "ITEM1");
        assert_eq!(handle.version.as_deref(), Some("\"{E1},1\""));
    }

    #[tokio::test]
    async fn test_lookup_missing_returns_none() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|_| {
            Ok(response(
                404,
                r#"{"error": {"code": "itemNotFound", "message": "not found"}}"#,
            ))
        });

        let connector = OneDriveConnector::new(Arc::new(mock_http));
        let handle = connector.lookup("Documents/x.json", "t").await.unwrap();
        assert!(handle.is_none());
    }

    #[tokio::test]
    async fn test_lookup_unauthorized() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(401, r#"{"error": {"code": "InvalidAuthenticationToken", "message": "expired"}}"#)));

        let connector = OneDriveConnector::new(Arc::new(mock_http));
        let error = connector.lookup("Documents/x.json", "t").await.unwrap_err();
        assert!(matches!(error, BridgeError::Unauthorized { status: 401 }));
    }

    #[tokio::test]
    async fn test_create_uses_fail_conflict_behavior() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.method, HttpMethod::Put);
            assert!(req.url.ends_with(
                "root:/Documents/calendar-events.json:/content?@microsoft.graph.conflictBehavior=fail"
            ));
            assert_eq!(req.body.as_deref(), Some(&b"[]"[..]));
            Ok(response(201, ITEM_JSON))
        });

        let connector = OneDriveConnector::new(Arc::new(mock_http));
        let handle = connector
            .create("Documents/calendar-events.json", Bytes::from_static(b"[]"), "t")
            .await
            .unwrap();
        assert_eq!(handle.id, "ITEM1");
    }

    #[tokio::test]
    async fn test_create_conflict_maps_to_already_exists() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|_| {
            Ok(response(
                409,
                r#"{"error": {"code": "nameAlreadyExists", "message": "exists"}}"#,
            ))
        });

        let connector = OneDriveConnector::new(Arc::new(mock_http));
        let error = connector
            .create("Documents/calendar-events.json", Bytes::from_static(b"[]"), "t")
            .await
            .unwrap_err();
        assert!(matches!(error, BridgeError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_read_content() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert!(req.url.ends_with("/me/drive/items/ITEM1/content"));
            Ok(response(200, "[]"))
        });

        let connector = OneDriveConnector::new(Arc::new(mock_http));
        let body = connector.read("ITEM1", "t").await.unwrap();
        assert_eq!(&body[..], b"[]");
    }

    #[tokio::test]
    async fn test_conditional_write_sends_if_match() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.method, HttpMethod::Put);
            assert_eq!(
                req.headers.get("If-Match"),
                Some(&"\"{E1},1\"".to_string())
            );
            Ok(response(
                200,
                r#"{"id": "ITEM1", "eTag": "\"{E1},2\""}"#,
            ))
        });

        let connector = OneDriveConnector::new(Arc::new(mock_http));
        let handle = connector
            .write("ITEM1", Bytes::from_static(b"[]"), Some("\"{E1},1\""), "t")
            .await
            .unwrap();
        assert_eq!(handle.version.as_deref(), Some("\"{E1},2\""));
    }

    #[tokio::test]
    async fn test_unconditional_write_omits_if_match() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert!(!req.headers.contains_key("If-Match"));
            Ok(response(200, ITEM_JSON))
        });

        let connector = OneDriveConnector::new(Arc::new(mock_http));
        connector
            .write("ITEM1", Bytes::from_static(b"[]"), None, "t")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stale_etag_maps_to_precondition_failed() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(412, "")));

        let connector = OneDriveConnector::new(Arc::new(mock_http));
        let error = connector
            .write("ITEM1", Bytes::from_static(b"[]"), Some("\"{E1},1\""), "t")
            .await
            .unwrap_err();

        match error {
            BridgeError::PreconditionFailed { expected } => assert_eq!(expected, "\"{E1},1\""),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(503, "")));

        let connector = OneDriveConnector::new(Arc::new(mock_http));
        let error = connector.metadata("ITEM1", "t").await.unwrap_err();
        assert!(error.is_transient());
    }

    #[tokio::test]
    async fn test_transport_error_passes_through() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::Timeout("read".to_string())));

        let connector = OneDriveConnector::new(Arc::new(mock_http));
        let error = connector.read("ITEM1", "t").await.unwrap_err();
        assert!(matches!(error, BridgeError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_custom_base_url() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert!(req.url.starts_with("http://localhost:8080/me/drive/items/ITEM1"));
            assert_eq!(req.timeout, Some(Duration::from_secs(5)));
            Ok(response(200, ITEM_JSON))
        });

        let connector = OneDriveConnector::new(Arc::new(mock_http))
            .with_base_url("http://localhost:8080/")
            .with_timeout(Duration::from_secs(5));
        connector.metadata("ITEM1", "t").await.unwrap();
    }
}
