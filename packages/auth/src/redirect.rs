//! # Post-login redirect validation
//!
//! The `/login` endpoint accepts a `redirect` value chosen by the client. It is
//! stored in the flow session and replayed as the `Location` of the final
//! callback response, so it must never point at another origin.
//!
//! [`validate`] accepts only relative references. Anything carrying a scheme or
//! an authority (`https://evil.example`, `//evil.example`, `/\evil.example`) is
//! rejected, as is input that cannot be parsed. Rejections always come with
//! [`ROOT`] as the safe fallback.

use oauth2::url::{ParseError, Url};
use thiserror::Error;
use tracing::warn;

/// Fallback destination for empty or rejected input.
pub const ROOT: &str = "/";

/// Origin used to resolve relative input. Never leaves this module.
const PROBE_BASE: &str = "http://redirect.invalid/";

/// Why a redirect target was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RedirectError {
    #[error("could not parse redirect URL: {0}")]
    Parse(String),
    #[error("URL must not be absolute")]
    Absolute,
}

impl RedirectError {
    /// The destination to use instead of the rejected one.
    pub fn fallback(&self) -> &'static str {
        ROOT
    }
}

/// Validate a client-supplied redirect target.
///
/// Empty input yields `"/"`. Relative paths are returned unchanged.
pub fn validate(path: &str) -> Result<String, RedirectError> {
    if path.is_empty() {
        return Ok(ROOT.to_string());
    }
    if let Some(c) = path.chars().find(|c| c.is_ascii_control()) {
        return Err(RedirectError::Parse(format!(
            "invalid control character {:?}",
            c
        )));
    }

    match Url::parse(path) {
        Ok(_) => return Err(RedirectError::Absolute),
        Err(ParseError::RelativeUrlWithoutBase) => {}
        Err(e) => return Err(RedirectError::Parse(e.to_string())),
    }

    // Relative input may still smuggle an authority (`//host`, `/\host`).
    let base = Url::parse(PROBE_BASE).map_err(|e| RedirectError::Parse(e.to_string()))?;
    let resolved = base
        .join(path)
        .map_err(|e| RedirectError::Parse(e.to_string()))?;
    if resolved.scheme() != base.scheme() || resolved.host_str() != base.host_str() {
        return Err(RedirectError::Absolute);
    }

    Ok(path.to_string())
}

/// Like [`validate`], but always yields a usable destination. Rejections are
/// logged and replaced by their fallback.
///
/// A rejected target does not fail the login: the flow goes ahead and lands on
/// [`ROOT`], the same place an empty `redirect` leads.
pub fn sanitize(path: &str) -> String {
    validate(path).unwrap_or_else(|e| {
        warn!(redirect = %path, error = %e, "rejected login redirect");
        e.fallback().to_string()
    })
}
