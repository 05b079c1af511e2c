//! Session upload to the remote collector.
//!
//! A sealed session is serialized to a row-oriented text table and posted
//! once as a form-encoded request. There is no retry: if the single attempt
//! fails, the session's data is gone.

use crate::capture::FusedRow;
use crate::queue::CompletionSink;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Header line of every uploaded table.
pub const HEADER: &str = "timestamp,accel_x,accel_y,accel_z,gyro_x,gyro_y,gyro_z";

/// Collector endpoint and file naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// `http` or `https`
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Collector host
    pub host: String,
    /// Collector port
    pub port: u16,
    /// Request path, starting with `/`
    pub path: String,
    /// File name prefix, e.g. `gesture` in `gesture_3.csv`
    pub file_prefix: String,
    /// File name extension without the dot
    pub file_extension: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            host: "192.168.1.9".to_string(),
            port: 5001,
            path: "/post".to_string(),
            file_prefix: "gesture".to_string(),
            file_extension: "csv".to_string(),
        }
    }
}

fn default_scheme() -> String {
    "http".to_string()
}

impl UploadConfig {
    /// Create a configuration for the given endpoint with default naming.
    pub fn new(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            path: path.into(),
            ..Self::default()
        }
    }

    /// Replace scheme, host, port and path from an `http(s)://host:port/path` URL.
    pub fn set_endpoint(&mut self, url: &str) -> Result<(), String> {
        let parsed = reqwest::Url::parse(url).map_err(|e| format!("Invalid URL '{url}': {e}"))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(format!("Unsupported scheme '{}'", parsed.scheme()));
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(format!("URL '{url}' must not carry a query or fragment"));
        }
        let host = parsed
            .host_str()
            .ok_or_else(|| format!("URL '{url}' has no host"))?;
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| format!("URL '{url}' has no port"))?;

        self.scheme = parsed.scheme().to_string();
        self.host = host.to_string();
        self.port = port;
        self.path = parsed.path().to_string();
        Ok(())
    }

    /// Get the full upload URL.
    pub fn url(&self) -> String {
        format!("{}://{}:{}{}", self.scheme, self.host, self.port, self.path)
    }

    /// Check the naming and path settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.scheme != "http" && self.scheme != "https" {
            return Err(format!("upload scheme must be http or https, got '{}'", self.scheme));
        }
        if self.host.is_empty() {
            return Err("upload host must not be empty".to_string());
        }
        if !self.path.starts_with('/') {
            return Err(format!("upload path must start with '/', got '{}'", self.path));
        }
        for (name, value) in [
            ("file_prefix", &self.file_prefix),
            ("file_extension", &self.file_extension),
        ] {
            if value.is_empty() || value.contains(|c: char| matches!(c, '/' | '\\' | '.')) {
                return Err(format!("{name} must be a plain non-empty name, got '{value}'"));
            }
        }
        Ok(())
    }
}

/// Upload error types.
#[derive(Debug)]
pub enum UploadError {
    /// The HTTP client could not be built
    Client(String),
    /// No response was received
    Network(String),
    /// The collector answered with a non-success status
    ServerRejected { status: u16, body: String },
}

impl UploadError {
    /// Notification text shown to the wearer.
    pub fn user_message(&self) -> String {
        match self {
            UploadError::Client(msg) => format!("Upload error: {msg}"),
            UploadError::Network(msg) => format!("Network error: {msg}"),
            UploadError::ServerRejected { status, .. } => format!("Server error: {status}"),
        }
    }
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadError::Client(msg) => write!(f, "Upload client error: {msg}"),
            UploadError::Network(msg) => write!(f, "Upload network error: {msg}"),
            UploadError::ServerRejected { status, body } => {
                write!(f, "Collector rejected upload ({status}): {body}")
            }
        }
    }
}

impl std::error::Error for UploadError {}

/// A response in the success class.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub status: u16,
    pub body: String,
}

/// Result of one upload attempt.
pub type UploadOutcome = Result<UploadReceipt, UploadError>;

/// Render rows as the upload table: header, then one line per row.
pub fn serialize_rows(rows: &[FusedRow]) -> String {
    let mut out = String::with_capacity(HEADER.len() + 1 + rows.len() * 64);
    out.push_str(HEADER);
    out.push('\n');

    for row in rows {
        // Writing to a String cannot fail.
        let _ = write!(out, "{}", row.timestamp_ms);
        for value in row.values() {
            let _ = write!(out, ",{value}");
        }
        out.push('\n');
    }
    out
}

/// Deterministic file name for a session, e.g. `gesture_3.csv`.
pub fn file_name(prefix: &str, session_index: u64, extension: &str) -> String {
    format!("{prefix}_{session_index}.{extension}")
}

/// One session, ready to post.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub session_index: u64,
    /// Serialized table
    pub value: String,
    pub file_name: String,
    pub row_count: usize,
}

impl UploadRequest {
    pub fn new(rows: &[FusedRow], session_index: u64, config: &UploadConfig) -> Self {
        Self {
            session_index,
            value: serialize_rows(rows),
            file_name: file_name(&config.file_prefix, session_index, &config.file_extension),
            row_count: rows.len(),
        }
    }

    /// Form fields in posting order.
    pub fn form_fields(&self) -> [(&'static str, String); 3] {
        [
            ("value", self.value.clone()),
            ("fileNum", self.session_index.to_string()),
            ("fileName", self.file_name.clone()),
        ]
    }
}

/// Non-blocking upload capability.
///
/// `dispatch` returns immediately; the outcome is reported later through
/// the completion sink, from whatever context the transport runs on.
pub trait UploadDispatch: Send {
    fn dispatch(&self, request: UploadRequest, completion: CompletionSink);
}

/// Uploader posting to the collector over HTTP.
pub struct HttpUploader {
    url: String,
    client: reqwest::Client,
    runtime: tokio::runtime::Handle,
}

impl HttpUploader {
    /// Create an uploader that runs requests on the given runtime.
    pub fn new(config: &UploadConfig, runtime: tokio::runtime::Handle) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("gesture-capture/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UploadError::Client(e.to_string()))?;

        Ok(Self {
            url: config.url(),
            client,
            runtime,
        })
    }

    /// Get the upload URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Post one session. A single attempt; the caller decides nothing else.
    pub async fn submit(&self, request: &UploadRequest) -> UploadOutcome {
        post_form(&self.client, &self.url, request).await
    }
}

impl UploadDispatch for HttpUploader {
    fn dispatch(&self, request: UploadRequest, completion: CompletionSink) {
        let client = self.client.clone();
        let url = self.url.clone();

        tracing::debug!(
            session = request.session_index,
            rows = request.row_count,
            file = %request.file_name,
            "Dispatching upload to {url}"
        );

        self.runtime.spawn(async move {
            let outcome = post_form(&client, &url, &request).await;
            completion.complete(request.session_index, outcome);
        });
    }
}

async fn post_form(client: &reqwest::Client, url: &str, request: &UploadRequest) -> UploadOutcome {
    let response = client
        .post(url)
        .form(&request.form_fields())
        .send()
        .await
        .map_err(|e| UploadError::Network(e.to_string()))?;

    let status = response.status();
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!(
                status = status.as_u16(),
                error = %e,
                "Could not read collector response body"
            );
            String::new()
        }
    };
    tracing::debug!(status = status.as_u16(), body = %body, "Collector response");

    if !status.is_success() {
        return Err(UploadError::ServerRejected {
            status: status.as_u16(),
            body,
        });
    }

    Ok(UploadReceipt {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::MotionSample;

    #[test]
    fn test_upload_config_url() {
        let config = UploadConfig::new("127.0.0.1", 8080, "/post");
        assert_eq!(config.url(), "http://127.0.0.1:8080/post");
        assert_eq!(config.file_prefix, "gesture");
    }

    #[test]
    fn test_set_endpoint() {
        let mut config = UploadConfig::default();
        config.set_endpoint("http://10.0.0.2:6000/upload").unwrap();
        assert_eq!(config.host, "10.0.0.2");
        assert_eq!(config.port, 6000);
        assert_eq!(config.path, "/upload");

        config.set_endpoint("http://collector.local/").unwrap();
        assert_eq!(config.port, 80);
        assert_eq!(config.path, "/");

        assert!(config.set_endpoint("ftp://host/x").is_err());
        assert!(config.set_endpoint("not a url").is_err());
    }

    #[test]
    fn test_set_endpoint_keeps_https() {
        let mut config = UploadConfig::default();
        config
            .set_endpoint("https://collector.example.com/post")
            .unwrap();
        assert_eq!(config.scheme, "https");
        assert_eq!(config.url(), "https://collector.example.com:443/post");

        config.set_endpoint("http://10.0.0.2:6000/upload").unwrap();
        assert_eq!(config.url(), "http://10.0.0.2:6000/upload");
    }

    #[test]
    fn test_set_endpoint_rejects_query() {
        let mut config = UploadConfig::default();
        assert!(config.set_endpoint("http://10.0.0.2:6000/post?key=1").is_err());
        assert!(config.set_endpoint("http://10.0.0.2:6000/post#frag").is_err());
        assert_eq!(config.url(), "http://192.168.1.9:5001/post");
    }

    #[test]
    fn test_scheme_defaults_when_missing_from_file() {
        let json = r#"{"host":"10.0.0.2","port":6000,"path":"/post","file_prefix":"gesture","file_extension":"csv"}"#;
        let config: UploadConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.scheme, "http");
        assert_eq!(config.url(), "http://10.0.0.2:6000/post");
    }

    #[test]
    fn test_validate_naming() {
        let mut config = UploadConfig::default();
        assert!(config.validate().is_ok());

        config.file_prefix = "../x".to_string();
        assert!(config.validate().is_err());

        let mut config = UploadConfig::default();
        config.path = "post".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialize_single_row() {
        let rows = [FusedRow::new(
            0,
            MotionSample::new(1.0, 2.0, 3.0),
            MotionSample::new(4.0, 5.0, 6.0),
        )];
        assert_eq!(
            serialize_rows(&rows),
            "timestamp,accel_x,accel_y,accel_z,gyro_x,gyro_y,gyro_z\n0,1,2,3,4,5,6\n"
        );
    }

    #[test]
    fn test_serialize_fractional_values() {
        let rows = [
            FusedRow::new(
                12,
                MotionSample::new(0.25, -9.81, 0.1),
                MotionSample::new(-0.5, 0.0, 1.5),
            ),
            FusedRow::new(
                22,
                MotionSample::new(0.5, -9.8, 0.2),
                MotionSample::new(-0.5, 0.0, 1.5),
            ),
        ];
        let text = serialize_rows(&rows);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "12,0.25,-9.81,0.1,-0.5,0,1.5");
        assert_eq!(lines[2], "22,0.5,-9.8,0.2,-0.5,0,1.5");
    }

    #[test]
    fn test_serialize_empty() {
        assert_eq!(serialize_rows(&[]), format!("{HEADER}\n"));
    }

    #[test]
    fn test_request_fields() {
        let config = UploadConfig::default();
        let request = UploadRequest::new(&[], 7, &config);
        let fields = request.form_fields();

        assert_eq!(fields[0].0, "value");
        assert_eq!(fields[1], ("fileNum", "7".to_string()));
        assert_eq!(fields[2], ("fileName", "gesture_7.csv".to_string()));
        assert_eq!(request.row_count, 0);
    }

    #[test]
    fn test_user_messages() {
        let err = UploadError::ServerRejected {
            status: 503,
            body: "busy".to_string(),
        };
        assert_eq!(err.user_message(), "Server error: 503");

        let err = UploadError::Network("connection refused".to_string());
        assert_eq!(err.user_message(), "Network error: connection refused");
    }
}
