//! Diagnostic HTTP probe

use crate::config::{Decode, ProbeConfig};
use hyper::{
    body::HttpBody, client::HttpConnector, header::LOCATION, http::uri::InvalidUri, Client,
    StatusCode, Uri,
};
use std::{fmt, time::Duration};

/// Redirect hops followed before giving up
pub const MAX_REDIRECTS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("invalid url `{0}`: {1}")]
    InvalidUrl(String, InvalidUri),

    #[error("{0}")]
    Http(#[from] hyper::Error),

    #[error("HTTP Error {code}: {reason}")]
    Status { code: u16, reason: String },

    #[error("redirect to invalid location `{0}`")]
    InvalidRedirect(String),

    #[error("too many redirects (more than {0})")]
    TooManyRedirects(usize),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Result of a single probe attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A 2xx response arrived; `preview` is the decoded start of the body
    Completed { status: u16, preview: String },

    /// No usable response (bad url, connection error, timeout, error status, broken body)
    Failed { message: String },
}

impl ProbeOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ProbeOutcome::Completed { .. })
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Completed { status, preview } => {
                writeln!(f, "Status: {}", status)?;
                write!(f, "Body preview:\n{}", preview)
            }
            ProbeOutcome::Failed { message } => write!(f, "Request failed: {}", message),
        }
    }
}

/// One bounded GET against a fixed endpoint
#[derive(Clone, Debug)]
pub struct Probe {
    url: String,
    timeout: Duration,
    preview_bytes: usize,
    decode: Decode,
}

impl Probe {
    /// # Arguments
    /// * `url` - `http://` endpoint to fetch
    /// * `timeout` - Upper bound on the whole exchange (connect, headers, body)
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
            preview_bytes: 2000,
            decode: Decode::Replace,
        }
    }

    pub fn from_config(cfg: &ProbeConfig) -> Self {
        Self::new(cfg.url.clone(), cfg.timeout())
            .preview_bytes(cfg.preview_bytes)
            .decode(cfg.decode)
    }

    /// Maximum number of body bytes kept for the preview
    pub fn preview_bytes(mut self, limit: usize) -> Self {
        self.preview_bytes = limit;
        self
    }

    pub fn decode(mut self, decode: Decode) -> Self {
        self.decode = decode;
        self
    }

    /// Performs the request. Never fails: every error is folded into [`ProbeOutcome::Failed`]
    pub async fn run(&self) -> ProbeOutcome {
        tracing::info!("GET {}", self.url);

        let result = match tokio::time::timeout(self.timeout, self.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout(self.timeout)),
        };

        match result {
            Ok((status, body)) => {
                tracing::debug!(status, bytes = body.len(), "probe completed");
                ProbeOutcome::Completed {
                    status,
                    preview: decode(&body, self.decode),
                }
            }
            Err(error) => {
                tracing::warn!(%error, url = %self.url, "probe failed");
                ProbeOutcome::Failed {
                    message: error.to_string(),
                }
            }
        }
    }

    /// Sends the request, following redirects, and reads at most `preview_bytes` of the body
    async fn fetch(&self) -> Result<(u16, Vec<u8>), ProbeError> {
        let mut uri: Uri = self
            .url
            .parse()
            .map_err(|error| ProbeError::InvalidUrl(self.url.clone(), error))?;

        let client: Client<HttpConnector> = Client::new();
        for _ in 0..=MAX_REDIRECTS {
            let mut response = client.get(uri.clone()).await?;
            let status = response.status();

            if is_followed_redirect(status) {
                if let Some(location) = response.headers().get(LOCATION) {
                    let location = String::from_utf8_lossy(location.as_bytes()).into_owned();
                    uri = resolve_location(&uri, &location)?;
                    tracing::debug!(%status, %uri, "following redirect");
                    continue;
                }
            }

            if !status.is_success() {
                return Err(ProbeError::Status {
                    code: status.as_u16(),
                    reason: status.canonical_reason().unwrap_or("Unknown").into(),
                });
            }

            // stop pulling chunks once the preview is full; the rest of the body is never read
            let body = response.body_mut();
            let mut buf = Vec::new();
            while buf.len() < self.preview_bytes {
                match body.data().await {
                    Some(chunk) => buf.extend_from_slice(&chunk?),
                    None => break,
                }
            }
            buf.truncate(self.preview_bytes);

            return Ok((status.as_u16(), buf));
        }

        Err(ProbeError::TooManyRedirects(MAX_REDIRECTS))
    }
}

fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

/// Resolves a `Location` header value against the uri that produced it
fn resolve_location(base: &Uri, location: &str) -> Result<Uri, ProbeError> {
    let invalid = || ProbeError::InvalidRedirect(location.to_owned());

    if let Ok(uri) = location.parse::<Uri>() {
        if uri.scheme().is_some() && uri.authority().is_some() {
            return Ok(uri);
        }
    }

    let scheme = base.scheme_str().ok_or_else(invalid)?;
    let authority = base.authority().ok_or_else(invalid)?;
    let path = if location.starts_with('/') {
        location.to_owned()
    } else {
        let dir = base.path().rsplitn(2, '/').nth(1).unwrap_or("");
        format!("{}/{}", dir, location)
    };

    format!("{}://{}{}", scheme, authority, path)
        .parse()
        .map_err(|_| invalid())
}

/// Decodes a body preview as UTF-8 without ever failing
pub fn decode(bytes: &[u8], policy: Decode) -> String {
    match policy {
        Decode::Replace => String::from_utf8_lossy(bytes).into_owned(),
        Decode::Ignore => decode_ignore(bytes),
    }
}

fn decode_ignore(mut bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    loop {
        match std::str::from_utf8(bytes) {
            Ok(s) => {
                out.push_str(s);
                return out;
            }
            Err(error) => {
                let (valid, rest) = bytes.split_at(error.valid_up_to());
                if let Ok(s) = std::str::from_utf8(valid) {
                    out.push_str(s);
                }

                match error.error_len() {
                    Some(len) => bytes = &rest[len..],
                    // truncated sequence at the very end
                    None => return out,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_marks_each_invalid_sequence() {
        let bytes = b"ok \xff\xfe done \xe2\x82";
        assert_eq!(
            decode(bytes, Decode::Replace),
            "ok \u{FFFD}\u{FFFD} done \u{FFFD}"
        );
    }

    #[test]
    fn ignore_drops_invalid_sequences() {
        let bytes = b"ok \xff\xfe done \xe2\x82";
        assert_eq!(decode(bytes, Decode::Ignore), "ok  done ");
        assert_eq!(decode("caf\u{e9}".as_bytes(), Decode::Ignore), "caf\u{e9}");
        assert_eq!(decode(b"", Decode::Ignore), "");
    }

    #[test]
    fn outcome_display() {
        let ok = ProbeOutcome::Completed {
            status: 200,
            preview: "hello".into(),
        };
        assert_eq!(ok.to_string(), "Status: 200\nBody preview:\nhello");

        let failed = ProbeOutcome::Failed {
            message: "timed out after 5s".into(),
        };
        assert_eq!(failed.to_string(), "Request failed: timed out after 5s");
    }

    #[test]
    fn location_resolution() {
        let base: Uri = "http://lab.local:8080/a/b".parse().unwrap();

        let abs = resolve_location(&base, "http://other:81/x").unwrap();
        assert_eq!(abs.to_string(), "http://other:81/x");

        let rooted = resolve_location(&base, "/elsewhere?q=1").unwrap();
        assert_eq!(rooted.to_string(), "http://lab.local:8080/elsewhere?q=1");

        let relative = resolve_location(&base, "c").unwrap();
        assert_eq!(relative.to_string(), "http://lab.local:8080/a/c");

        assert!(resolve_location(&base, "/bad path").is_err());
    }

    #[test]
    fn error_status_message() {
        let error = ProbeError::Status {
            code: 404,
            reason: "Not Found".into(),
        };
        assert_eq!(error.to_string(), "HTTP Error 404: Not Found");
    }

    #[tokio::test]
    async fn invalid_url_fails_without_panicking() {
        let outcome = Probe::new("not a url", Duration::from_secs(1)).run().await;
        match outcome {
            ProbeOutcome::Failed { message } => assert!(message.starts_with("invalid url")),
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
