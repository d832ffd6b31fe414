use super::types::{CountResponse, ErrorBody, SignupRequest};
use super::{
    ApiError, Discussion, DiscussionPage, Endpoints, FeedScope, FileAttachment, NewDiscussion,
    Page, UserSummary, UserUpdate,
};
use futures::StreamExt;
use reqwest::{header, Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Cap on any single response body.
const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// Username and password sent as HTTP Basic auth on every request.
///
/// `SecretString` keeps the password out of `Debug` output.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// HTTP client for the forum REST API.
///
/// Cheap to clone: the underlying `reqwest::Client` pools connections and the
/// endpoint set and credentials are shared.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    endpoints: Arc<Endpoints>,
    credentials: Option<Arc<Credentials>>,
    timeout: Duration,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("server", &self.endpoints.server().as_str())
            .field(
                "user",
                &self.credentials.as_ref().map(|c| c.username.as_str()),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ApiClient {
    pub fn new(server_url: &str, api_prefix: &str, timeout: Duration) -> Result<Self, ApiError> {
        let endpoints = Endpoints::new(server_url, api_prefix)?;

        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            endpoints: Arc::new(endpoints),
            credentials: None,
            timeout,
        })
    }

    /// Attach (or clear) the credentials sent with every subsequent request.
    ///
    /// Refuses to attach credentials to a plain-HTTP remote server.
    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Result<Self, ApiError> {
        if credentials.is_some() && !self.endpoints.allows_credentials() {
            tracing::error!(
                server = %self.endpoints.server(),
                "Refusing to send credentials over plain HTTP to a remote host"
            );
            return Err(ApiError::InsecureBaseUrl);
        }
        self.credentials = credentials.map(Arc::new);
        Ok(self)
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    // ------------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------------

    /// `POST /users`: create an account.
    pub async fn signup(
        &self,
        username: &str,
        display_name: &str,
        password: &SecretString,
    ) -> Result<(), ApiError> {
        let body = SignupRequest {
            username,
            display_name,
            password: password.expose_secret(),
        };
        let request = self.json_request(Method::POST, self.endpoints.users(), &body)?;
        self.execute(request).await?;
        tracing::info!(username = %username, "Account created");
        Ok(())
    }

    /// `POST /login` with the given credentials as Basic auth.
    ///
    /// Uses `credentials` rather than whatever the client already carries, so
    /// it works on an anonymous client.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserSummary, ApiError> {
        if !self.endpoints.allows_credentials() {
            return Err(ApiError::InsecureBaseUrl);
        }
        let request = self
            .http
            .post(self.endpoints.login())
            .basic_auth(&credentials.username, Some(credentials.password.expose_secret()))
            .header(header::CONTENT_TYPE, "application/json")
            .body("{}");
        let bytes = self.execute(request).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// `GET /users?page=&size=`
    pub async fn list_users(&self, page: u32, size: u32) -> Result<Page<UserSummary>, ApiError> {
        self.get_json(self.endpoints.user_list(page, size)).await
    }

    /// `GET /users/{username}`
    pub async fn get_user(&self, username: &str) -> Result<UserSummary, ApiError> {
        self.get_json(self.endpoints.user(username)).await
    }

    /// `PUT /users/{id}`
    pub async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<UserSummary, ApiError> {
        let request = self.json_request(Method::PUT, self.endpoints.user_by_id(id), update)?;
        let bytes = self.execute(request).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    // ------------------------------------------------------------------------
    // Discussions
    // ------------------------------------------------------------------------

    /// `POST /discussions`
    pub async fn post_discussion(&self, discussion: &NewDiscussion) -> Result<(), ApiError> {
        let request = self.json_request(Method::POST, self.endpoints.discussions(), discussion)?;
        self.execute(request).await?;
        Ok(())
    }

    /// `POST /discussions/upload` as multipart field `file`.
    pub async fn upload_attachment(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<FileAttachment, ApiError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let request = self
            .authorize(self.http.post(self.endpoints.upload()))
            .multipart(form);
        let bytes = self.execute(request).await?;
        let attachment: FileAttachment = serde_json::from_slice(&bytes)?;
        tracing::debug!(
            attachment_id = attachment.id,
            file_type = %attachment.file_type,
            "Attachment uploaded"
        );
        Ok(attachment)
    }

    /// `DELETE /discussions/{id}`
    pub async fn delete_discussion(&self, id: i64) -> Result<(), ApiError> {
        let request = self.authorize(self.http.delete(self.endpoints.discussion(id)));
        self.execute(request).await?;
        Ok(())
    }

    /// First page of a feed, newest first.
    pub async fn load_discussions(
        &self,
        scope: &FeedScope,
        size: u32,
    ) -> Result<DiscussionPage, ApiError> {
        self.get_json(self.endpoints.first_page(scope, size)).await
    }

    /// Page of discussions strictly older than `cursor`.
    pub async fn load_older(
        &self,
        scope: &FeedScope,
        cursor: i64,
        size: u32,
    ) -> Result<DiscussionPage, ApiError> {
        self.get_json(self.endpoints.older_than(scope, cursor, size))
            .await
    }

    /// Every discussion strictly newer than `cursor`, unpaged.
    pub async fn load_newer(
        &self,
        scope: &FeedScope,
        cursor: i64,
    ) -> Result<Vec<Discussion>, ApiError> {
        self.get_json(self.endpoints.newer_than(scope, cursor)).await
    }

    /// Number of discussions strictly newer than `cursor`.
    pub async fn count_newer(&self, scope: &FeedScope, cursor: i64) -> Result<u64, ApiError> {
        let response: CountResponse = self
            .get_json(self.endpoints.newer_count(scope, cursor))
            .await?;
        Ok(response.count)
    }

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(c) => {
                tracing::trace!("Basic authentication configured");
                request.basic_auth(&c.username, Some(c.password.expose_secret()))
            }
            None => request,
        }
    }

    fn json_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> Result<RequestBuilder, ApiError> {
        let payload = serde_json::to_vec(body)?;
        Ok(self
            .authorize(self.http.request(method, url))
            .header(header::CONTENT_TYPE, "application/json")
            .body(payload))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let request = self.authorize(self.http.get(url));
        let bytes = self.execute(request).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send a request and return the body of a 2xx response.
    ///
    /// Non-2xx responses are decoded from the server's error envelope; a 400
    /// with field errors becomes [`ApiError::Validation`].
    async fn execute(&self, request: RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| ApiError::Timeout)?
            .map_err(|e| {
                if e.is_timeout() {
                    ApiError::Timeout
                } else {
                    ApiError::Network(e)
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return read_limited_bytes(response, MAX_RESPONSE_SIZE).await;
        }

        // Error bodies are best-effort; a garbled envelope still yields the status.
        let body = read_limited_bytes(response, MAX_RESPONSE_SIZE)
            .await
            .ok()
            .and_then(|bytes| serde_json::from_slice::<ErrorBody>(&bytes).ok())
            .unwrap_or_default();

        tracing::debug!(
            status = status.as_u16(),
            url = body.url.as_deref().unwrap_or(""),
            message = body.message.as_deref().unwrap_or(""),
            "Request rejected by server"
        );

        if status == reqwest::StatusCode::BAD_REQUEST && !body.validation_errors.is_empty() {
            return Err(ApiError::Validation {
                message: body.message.unwrap_or_else(|| "Validation error".to_string()),
                errors: body.validation_errors,
            });
        }

        Err(ApiError::HttpStatus {
            status: status.as_u16(),
            message: body.message,
        })
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, ApiError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ApiError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.uri(), "/api/1.0", Duration::from_secs(5)).unwrap()
    }

    fn user_json(id: i64, username: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "username": username,
            "displayName": format!("display{id}"),
            "image": format!("profile{id}.png")
        })
    }

    #[tokio::test]
    async fn test_login_sends_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/1.0/login"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json(1, "user1")))
            .expect(1)
            .mount(&server)
            .await;

        let user = client(&server)
            .login(&Credentials::new("user1", "P4ssword"))
            .await
            .unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.display_name, "display1");
    }

    #[tokio::test]
    async fn test_login_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/1.0/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "status": 401, "message": "Unauthorized", "url": "/api/1.0/login"
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .login(&Credentials::new("user1", "wrong"))
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_signup_validation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/1.0/users"))
            .and(body_json(serde_json::json!({
                "username": "u1", "displayName": "display1", "password": "P4ssword"
            })))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "status": 400,
                "message": "Validator error",
                "url": "/api/1.0/users",
                "validationErrors": {"username": "size must be between 4 and 255"}
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .signup("u1", "display1", &SecretString::from("P4ssword".to_string()))
            .await
            .unwrap_err();
        assert_eq!(
            err.field_error("username"),
            Some("size must be between 4 and 255")
        );
    }

    #[tokio::test]
    async fn test_list_users_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/1.0/users"))
            .and(query_param("page", "5"))
            .and(query_param("size", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [user_json(1, "user1")],
                "number": 5, "size": 10, "first": false, "last": true, "totalPages": 6
            })))
            .mount(&server)
            .await;

        let page = client(&server).list_users(5, 10).await.unwrap();
        assert_eq!(page.content.len(), 1);
        assert!(!page.first);
        assert!(page.last);
    }

    #[tokio::test]
    async fn test_count_newer_decodes_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/1.0/users/user1/discussions/10"))
            .and(query_param("direction", "after"))
            .and(query_param("count", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"count": 3})))
            .mount(&server)
            .await;

        let count = client(&server)
            .count_newer(&FeedScope::User("user1".into()), 10)
            .await
            .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_delete_sends_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/1.0/discussions/7"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server)
            .with_credentials(Some(Credentials::new("user1", "P4ssword")))
            .unwrap();
        assert!(api.is_authenticated());
        api.delete_discussion(7).await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_attachment_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/1.0/discussions/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 4, "date": 1561294668539_i64, "name": "f00d.png", "fileType": "image/png"
            })))
            .mount(&server)
            .await;

        let attachment = client(&server)
            .upload_attachment("cat.png", vec![0x89, 0x50, 0x4e, 0x47])
            .await
            .unwrap();
        assert_eq!(attachment.id, 4);
        assert!(attachment.is_image());
    }

    #[tokio::test]
    async fn test_non_json_error_body_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("<html>down</html>"))
            .mount(&server)
            .await;

        let err = client(&server)
            .load_discussions(&FeedScope::Global, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::HttpStatus { status: 503, message: None }));
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server)
            .load_newer(&FeedScope::Global, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"count": 1}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri(), "/api/1.0", Duration::from_millis(50)).unwrap();
        let err = api.count_newer(&FeedScope::Global, 0).await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout));
    }

    #[tokio::test]
    async fn test_credentials_refused_for_remote_http() {
        let api = ApiClient::new("http://forum.example.com", "/api/1.0", Duration::from_secs(5))
            .unwrap();
        let result = api.with_credentials(Some(Credentials::new("user1", "P4ssword")));
        assert!(matches!(result, Err(ApiError::InsecureBaseUrl)));
    }

    #[tokio::test]
    async fn test_debug_hides_password() {
        let api = ApiClient::new("https://forum.example.com", "/api/1.0", Duration::from_secs(5))
            .unwrap()
            .with_credentials(Some(Credentials::new("user1", "super-secret")))
            .unwrap();
        let debug = format!("{:?}", api);
        assert!(debug.contains("user1"));
        assert!(!debug.contains("super-secret"));
    }
}
