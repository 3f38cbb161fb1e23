//! The outbound request model
//!
//! A request names a target, the overlay protocol used to reach it, and
//! the payload contents that the exit hop will replay against the target.
//! `RequestData::to_bytes` produces the innermost plaintext of the onion
//! chain.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VeilNetError};

/// Overlay protocol a request travels over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RequestProtocol {
    #[default]
    Ssu,
    I2p,
}

impl std::str::FromStr for RequestProtocol {
    type Err = VeilNetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ssu" => Ok(RequestProtocol::Ssu),
            "i2p" => Ok(RequestProtocol::I2p),
            other => Err(VeilNetError::Validation(format!(
                "request_protocol must be 'ssu' or 'i2p', got {other}"
            ))),
        }
    }
}

impl std::fmt::Display for RequestProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestProtocol::Ssu => write!(f, "ssu"),
            RequestProtocol::I2p => write!(f, "i2p"),
        }
    }
}

/// Protocol of the payload the exit replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PayloadProtocol {
    #[default]
    Http,
    Https,
    Tcp,
    Udp,
}

const ALLOWED_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];

fn default_timeout() -> f64 {
    30.0
}

fn default_true() -> bool {
    true
}

fn default_buffer_size() -> usize {
    4096
}

/// HTTP request contents tunneled to the exit.
///
/// `method` is required on the wire so the untagged [`RequestContents`]
/// union can tell the HTTP and TCP forms apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpContents {
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: f64,
    #[serde(default = "default_true")]
    pub follow_redirects: bool,
}

fn default_method() -> String {
    "GET".to_string()
}

impl Default for HttpContents {
    fn default() -> Self {
        Self {
            method: default_method(),
            headers: BTreeMap::new(),
            body: None,
            timeout_secs: default_timeout(),
            follow_redirects: true,
        }
    }
}

impl HttpContents {
    pub fn validate(&self) -> Result<()> {
        let upper = self.method.to_ascii_uppercase();
        if !ALLOWED_METHODS.contains(&upper.as_str()) {
            return Err(VeilNetError::Validation(format!(
                "method must be one of: {}, got {}",
                ALLOWED_METHODS.join(", "),
                self.method
            )));
        }
        if self.timeout_secs <= 0.0 {
            return Err(VeilNetError::Validation(
                "timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn add_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key.into(), value.into());
    }

    /// Set a JSON body and the matching content-type header.
    pub fn set_json_body(&mut self, data: &serde_json::Value) -> Result<()> {
        self.body = Some(serde_json::to_string(data)?);
        self.add_header("Content-Type", "application/json");
        Ok(())
    }
}

/// Raw TCP contents tunneled to the exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcpContents {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: f64,
    #[serde(default)]
    pub keep_alive: bool,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl Default for TcpContents {
    fn default() -> Self {
        Self {
            data: None,
            timeout_secs: default_timeout(),
            keep_alive: false,
            buffer_size: default_buffer_size(),
        }
    }
}

impl TcpContents {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs <= 0.0 {
            return Err(VeilNetError::Validation(
                "timeout must be positive".to_string(),
            ));
        }
        if self.buffer_size == 0 {
            return Err(VeilNetError::Validation(
                "buffer size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Contents variant, matching the payload protocol family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestContents {
    Http(HttpContents),
    Tcp(TcpContents),
}

impl RequestContents {
    pub fn validate(&self) -> Result<()> {
        match self {
            RequestContents::Http(contents) => contents.validate(),
            RequestContents::Tcp(contents) => contents.validate(),
        }
    }
}

/// The data that travels through the chain to the exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestData {
    #[serde(default)]
    pub protocol: PayloadProtocol,
    pub target: String,
    pub contents: RequestContents,
}

impl RequestData {
    pub fn http(target: impl Into<String>, contents: HttpContents) -> Self {
        Self {
            protocol: PayloadProtocol::Http,
            target: target.into(),
            contents: RequestContents::Http(contents),
        }
    }

    pub fn tcp(target: impl Into<String>, contents: TcpContents) -> Self {
        Self {
            protocol: PayloadProtocol::Tcp,
            target: target.into(),
            contents: RequestContents::Tcp(contents),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.target.is_empty() {
            return Err(VeilNetError::Validation("target must be set".to_string()));
        }
        self.contents.validate()
    }

    /// Serialize to the innermost chain plaintext.
    ///
    /// HTTP form: `<METHOD> <target>\r\n<headers>\r\n<body>`; TCP form is
    /// the raw data.
    pub fn to_bytes(&self) -> Vec<u8> {
        match &self.contents {
            RequestContents::Http(http) => {
                let mut out = String::new();
                out.push_str(&http.method.to_ascii_uppercase());
                out.push(' ');
                out.push_str(&self.target);
                out.push_str("\r\n");
                for (key, value) in &http.headers {
                    out.push_str(key);
                    out.push_str(": ");
                    out.push_str(value);
                    out.push_str("\r\n");
                }
                out.push_str("\r\n");
                if let Some(body) = &http.body {
                    out.push_str(body);
                }
                out.into_bytes()
            }
            RequestContents::Tcp(tcp) => tcp
                .data
                .as_ref()
                .map(|d| d.as_bytes().to_vec())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_parse() {
        assert_eq!("ssu".parse::<RequestProtocol>().unwrap(), RequestProtocol::Ssu);
        assert_eq!("i2p".parse::<RequestProtocol>().unwrap(), RequestProtocol::I2p);
        assert!("http".parse::<RequestProtocol>().is_err());
    }

    #[test]
    fn test_http_contents_validates_method() {
        let mut contents = HttpContents::default();
        assert!(contents.validate().is_ok());

        contents.method = "FETCH".to_string();
        assert!(contents.validate().is_err());
    }

    #[test]
    fn test_http_contents_rejects_nonpositive_timeout() {
        let contents = HttpContents {
            timeout_secs: 0.0,
            ..Default::default()
        };
        assert!(contents.validate().is_err());
    }

    #[test]
    fn test_tcp_contents_rejects_zero_buffer() {
        let contents = TcpContents {
            buffer_size: 0,
            ..Default::default()
        };
        assert!(contents.validate().is_err());
    }

    #[test]
    fn test_set_json_body_adds_content_type() {
        let mut contents = HttpContents::default();
        contents
            .set_json_body(&serde_json::json!({"k": "v"}))
            .unwrap();
        assert_eq!(
            contents.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(contents.body.as_deref(), Some("{\"k\":\"v\"}"));
    }

    #[test]
    fn test_bare_get_serialization() {
        let data = RequestData::http("http://example.com/", HttpContents::default());
        assert_eq!(data.to_bytes(), b"GET http://example.com/\r\n\r\n");
    }

    #[test]
    fn test_serialization_with_headers_and_body() {
        let mut contents = HttpContents {
            method: "post".to_string(),
            ..Default::default()
        };
        contents.add_header("Host", "example.com");
        contents.body = Some("payload".to_string());

        let data = RequestData::http("http://example.com/api", contents);
        assert_eq!(
            data.to_bytes(),
            b"POST http://example.com/api\r\nHost: example.com\r\n\r\npayload"
        );
    }

    #[test]
    fn test_tcp_serialization_is_raw_data() {
        let contents = TcpContents {
            data: Some("raw bytes".to_string()),
            ..Default::default()
        };
        let data = RequestData::tcp("10.0.0.1:4000", contents);
        assert_eq!(data.to_bytes(), b"raw bytes");
    }

    #[test]
    fn test_contents_union_discriminates_on_method() {
        let http: RequestContents =
            serde_json::from_str(r#"{"method":"GET"}"#).unwrap();
        assert!(matches!(http, RequestContents::Http(_)));

        let tcp: RequestContents =
            serde_json::from_str(r#"{"data":"x","buffer_size":512}"#).unwrap();
        assert!(matches!(tcp, RequestContents::Tcp(_)));
    }

    #[test]
    fn test_request_data_validate() {
        let data = RequestData::http("", HttpContents::default());
        assert!(data.validate().is_err());

        let data = RequestData::http("http://example.com/", HttpContents::default());
        assert!(data.validate().is_ok());
    }
}
