//! Builders for raw messages and configs.

#![allow(dead_code)]

use std::path::Path;

use autoverify::Config;

pub const TRAVEL_LINK: &str = "https://www.netflix.com/account/travel/verify?nftoken=travel123";
pub const GENERIC_LINK: &str = "https://www.netflix.com/account/verify?token=generic456";

/// Builds a config that needs no real credentials and keeps its processed
/// set inside `dir`.
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::new("me@example.com");
    config.app_password = Some("app-password".to_string());
    config.processed_file = dir.join("processed_emails.json");
    config.log_file = dir.join("daemon.log");
    config.check_interval_secs = 1;
    config.mark_seen = false;
    config
}

/// Builder for raw RFC 5322 messages.
pub struct RawEmailBuilder {
    from: String,
    subject: String,
    date: String,
    message_id: Option<String>,
    text: Option<String>,
    html: Option<String>,
}

impl RawEmailBuilder {
    pub fn new() -> Self {
        Self {
            from: "Netflix <info@account.netflix.com>".to_string(),
            subject: "Your temporary access code - verify".to_string(),
            date: "Mon, 6 Jan 2025 10:00:00 +0000".to_string(),
            message_id: None,
            text: None,
            html: None,
        }
    }

    pub fn from(mut self, from: &str) -> Self {
        self.from = from.to_string();
        self
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.subject = subject.to_string();
        self
    }

    pub fn message_id(mut self, id: &str) -> Self {
        self.message_id = Some(id.to_string());
        self
    }

    pub fn text(mut self, body: &str) -> Self {
        self.text = Some(body.to_string());
        self
    }

    pub fn html(mut self, body: &str) -> Self {
        self.html = Some(body.to_string());
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = String::new();
        out.push_str(&format!("From: {}\r\n", self.from));
        out.push_str("To: me@example.com\r\n");
        out.push_str(&format!("Subject: {}\r\n", self.subject));
        out.push_str(&format!("Date: {}\r\n", self.date));
        if let Some(id) = &self.message_id {
            out.push_str(&format!("Message-ID: <{}>\r\n", id));
        }
        out.push_str("MIME-Version: 1.0\r\n");

        match (self.text, self.html) {
            (Some(text), Some(html)) => {
                let boundary = "=_part_boundary";
                out.push_str(&format!(
                    "Content-Type: multipart/alternative; boundary=\"{}\"\r\n\r\n",
                    boundary
                ));
                out.push_str(&format!(
                    "--{b}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{text}\r\n\
                     --{b}\r\nContent-Type: text/html; charset=utf-8\r\n\r\n{html}\r\n\
                     --{b}--\r\n",
                    b = boundary,
                    text = text,
                    html = html
                ));
            }
            (None, Some(html)) => {
                out.push_str("Content-Type: text/html; charset=utf-8\r\n\r\n");
                out.push_str(&html);
                out.push_str("\r\n");
            }
            (text, None) => {
                out.push_str("Content-Type: text/plain; charset=utf-8\r\n\r\n");
                out.push_str(&text.unwrap_or_default());
                out.push_str("\r\n");
            }
        }

        out.into_bytes()
    }
}

impl Default for RawEmailBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A verification email whose plain-text body carries `link`.
pub fn verification_email(link: &str) -> Vec<u8> {
    RawEmailBuilder::new()
        .text(&format!("Tap the link to continue:\r\n[{}]\r\n", link))
        .build()
}

/// A Big5 verification email, as sent to Traditional Chinese accounts:
/// subject "Netflix 帳號存取碼", body "請點選連結：" followed by a travel
/// link with token `big5tok`.
pub fn big5_verification_email() -> Vec<u8> {
    b"From: Netflix <info@account.netflix.com>\r\n\
To: me@example.com\r\n\
Subject: =?big5?B?TmV0ZmxpeCCxYri5pnOo+r1Y?=\r\n\
Date: Mon, 6 Jan 2025 10:00:00 +0000\r\n\
MIME-Version: 1.0\r\n\
Content-Type: text/plain; charset=big5\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
vdDCSb/vs3O1sqFHDQpodHRwczovL3d3dy5uZXRmbGl4LmNvbS9hY2NvdW50L3RyYXZlbC92ZXJpZnk/bmZ0b2tlbj1iaWc1dG9rDQo=\r\n"
        .to_vec()
}
