// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! CAPTCHA token verification.
//!
//! The verification service is an external collaborator: an HTTP POST with a
//! shared secret and the client token, answering a success boolean. Only
//! that boolean contract matters here.

use crate::config::CaptchaConfig;
use crate::error::CaptchaError;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

/// Verifies CAPTCHA challenge tokens.
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    /// Verify `token`. `Ok(())` means the challenge is satisfied; any error
    /// means it is not.
    async fn verify(&self, token: &str) -> Result<(), CaptchaError>;
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    success: bool,
}

/// reCAPTCHA-style verifier posting `secret` and `response` form fields.
pub struct RecaptchaVerifier {
    http: reqwest::Client,
    config: CaptchaConfig,
}

impl RecaptchaVerifier {
    pub fn new(config: CaptchaConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl CaptchaVerifier for RecaptchaVerifier {
    async fn verify(&self, token: &str) -> Result<(), CaptchaError> {
        if !self.config.enabled {
            debug!("Captcha verification disabled; accepting token");
            return Ok(());
        }

        let response = self
            .http
            .post(&self.config.verify_url)
            .form(&[("secret", self.config.secret.as_str()), ("response", token)])
            .send()
            .await
            .map_err(|err| {
                warn!(error = %err, "Captcha verification service unreachable");
                CaptchaError::Unreachable(err.to_string())
            })?;

        let body: VerifyResponse = response
            .json()
            .await
            .map_err(|err| CaptchaError::MalformedResponse(err.to_string()))?;

        if body.success {
            Ok(())
        } else {
            Err(CaptchaError::TokenRejected)
        }
    }
}

/// Verifier that accepts or rejects every token. For tests and local runs
/// without a CAPTCHA account.
pub struct StaticCaptchaVerifier {
    accept: bool,
}

impl StaticCaptchaVerifier {
    pub fn accepting() -> Self {
        Self { accept: true }
    }

    pub fn rejecting() -> Self {
        Self { accept: false }
    }
}

#[async_trait]
impl CaptchaVerifier for StaticCaptchaVerifier {
    async fn verify(&self, _token: &str) -> Result<(), CaptchaError> {
        if self.accept {
            Ok(())
        } else {
            Err(CaptchaError::TokenRejected)
        }
    }
}
