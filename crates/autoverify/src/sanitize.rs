//! Helpers for keeping verification tokens out of the log.
//!
//! A verification link is a bearer credential until it is used, and the log
//! file outlives it. Only the scheme, host, path and parameter names are kept.

/// Replaces every query parameter value with `****`.
///
/// - `https://www.netflix.com/account/travel/verify?nftoken=abc` →
///   `https://www.netflix.com/account/travel/verify?nftoken=****`
/// - `https://www.netflix.com/account/verify` → unchanged
pub fn redact_link(url: &str) -> String {
    let (base, fragment) = match url.split_once('#') {
        Some((base, _)) => (base, "#****"),
        None => (url, ""),
    };

    let Some((path, query)) = base.split_once('?') else {
        return format!("{}{}", base, fragment);
    };

    let redacted: Vec<String> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((name, _)) => format!("{}=****", name),
            None => "****".to_string(),
        })
        .collect();

    format!("{}?{}{}", path, redacted.join("&"), fragment)
}
