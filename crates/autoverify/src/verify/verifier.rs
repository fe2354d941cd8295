//! Follows a verification link and classifies the result.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::redirect::Policy;
use tracing::debug;

use crate::sanitize::redact_link;

/// Only this many bytes of the response are read.
pub const BODY_PREFIX_LIMIT: usize = 2000;

const MAX_REDIRECTS: usize = 10;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";

/// Phrases that mark a confirmation page, matched case-insensitively.
pub const SUCCESS_KEYWORDS: &[&str] = &[
    "verified",
    "success",
    "驗證成功",
    "已驗證",
    "thank you",
    "謝謝",
    "confirmed",
    "確認",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    Connect,
    Redirect,
    HttpStatus,
    Body,
    Request,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Connect => "connect",
            FailureKind::Redirect => "redirect",
            FailureKind::HttpStatus => "http-status",
            FailureKind::Body => "body",
            FailureKind::Request => "request",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Result of one verification fetch. The classification is heuristic: it
/// reflects the HTTP exchange, not what the remote service recorded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VerificationOutcome {
    pub success: bool,
    pub status: Option<u16>,
    /// URL after redirects.
    pub final_url: Option<String>,
    pub matched_keyword: Option<String>,
    pub failure: Option<VerifyFailure>,
}

impl VerificationOutcome {
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            failure: Some(VerifyFailure {
                kind,
                message: message.into(),
            }),
            ..Default::default()
        }
    }

    /// Human-readable detail for logs.
    pub fn detail(&self) -> String {
        match (&self.failure, self.status) {
            (Some(failure), _) => failure.to_string(),
            (None, Some(status)) => format!("HTTP {}", status),
            (None, None) => "unknown".to_string(),
        }
    }
}

/// Performs the verification action for a link.
///
/// Implementations never return an error: every failure is folded into a
/// failed [`VerificationOutcome`].
#[async_trait(?Send)]
pub trait LinkVerifier {
    async fn verify(&self, link: &str) -> VerificationOutcome;
}

/// Verifier that issues a browser-like GET with `reqwest`.
pub struct HttpVerifier {
    client: reqwest::Client,
}

impl HttpVerifier {
    /// Builds a client with browser headers, `timeout` for the whole
    /// exchange, redirect following and default certificate validation.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(BROWSER_ACCEPT_LANGUAGE),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait(?Send)]
impl LinkVerifier for HttpVerifier {
    async fn verify(&self, link: &str) -> VerificationOutcome {
        debug!(link = %redact_link(link), "Requesting verification link");

        let mut response = match self.client.get(link).send().await {
            Ok(response) => response,
            Err(e) => return VerificationOutcome::failed(classify_error(&e), e.to_string()),
        };

        let status = response.status();
        let final_url = response.url().to_string();

        if status.is_client_error() || status.is_server_error() {
            return VerificationOutcome {
                status: Some(status.as_u16()),
                final_url: Some(final_url),
                failure: Some(VerifyFailure {
                    kind: FailureKind::HttpStatus,
                    message: format!(
                        "HTTP {}: {}",
                        status.as_u16(),
                        status.canonical_reason().unwrap_or("Unknown")
                    ),
                }),
                ..Default::default()
            };
        }

        let mut prefix: Vec<u8> = Vec::with_capacity(BODY_PREFIX_LIMIT);
        let mut body_failure = None;
        while prefix.len() < BODY_PREFIX_LIMIT {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    let take = chunk.len().min(BODY_PREFIX_LIMIT - prefix.len());
                    prefix.extend_from_slice(&chunk[..take]);
                }
                Ok(None) => break,
                Err(e) => {
                    debug!("Failed reading verification response body: {}", e);
                    body_failure = Some(VerifyFailure {
                        kind: classify_error(&e),
                        message: e.to_string(),
                    });
                    break;
                }
            }
        }

        let matched_keyword = find_success_keyword(&String::from_utf8_lossy(&prefix));
        let success = status.as_u16() == 200 || matched_keyword.is_some();

        VerificationOutcome {
            success,
            status: Some(status.as_u16()),
            final_url: Some(final_url),
            matched_keyword: matched_keyword.map(str::to_string),
            // A truncated body only matters when it cost us the verdict.
            failure: if success { None } else { body_failure },
        }
    }
}

/// Returns the first success keyword contained in `text`, ignoring case.
pub fn find_success_keyword(text: &str) -> Option<&'static str> {
    let haystack = text.to_lowercase();
    SUCCESS_KEYWORDS
        .iter()
        .copied()
        .find(|keyword| haystack.contains(&keyword.to_lowercase()))
}

fn classify_error(err: &reqwest::Error) -> FailureKind {
    if err.is_timeout() {
        FailureKind::Timeout
    } else if err.is_connect() {
        FailureKind::Connect
    } else if err.is_redirect() {
        FailureKind::Redirect
    } else if err.is_status() {
        FailureKind::HttpStatus
    } else if err.is_body() || err.is_decode() {
        FailureKind::Body
    } else {
        FailureKind::Request
    }
}
