//! Interactive sign-in with the OAuth 2.0 device authorization grant.
//!
//! The operator opens the verification page in any browser, enters the code,
//! and completes MFA there. The client polls the token endpoint at the
//! interval the identity platform asks for. A refresh token from that sign-in
//! is redeemed for further resources so the operator signs in once per run.
use super::http::{Http, RawResponse};
use crate::operator::Operator;
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::thread;
use std::time::{Duration, Instant};

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
/// Work and school accounts in any tenant.
const AUTHORITY_TENANT: &str = "organizations";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const SLOW_DOWN_INCREMENT_SECS: u64 = 5;

#[derive(Debug, Deserialize)]
struct DeviceCode {
    device_code: String,
    user_code: String,
    verification_uri: String,
    expires_in: u64,
    #[serde(default)]
    interval: Option<u64>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug)]
enum PollState {
    Pending,
    SlowDown,
    Done(TokenResponse),
}

pub struct DeviceCodeAuth {
    http: Http,
    authority_host: String,
    client_id: String,
}

impl DeviceCodeAuth {
    pub fn new(http: Http, authority_host: &str, client_id: &str) -> Self {
        Self {
            http,
            authority_host: authority_host.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
        }
    }

    fn endpoint(&self, leaf: &str) -> String {
        format!(
            "{}/{AUTHORITY_TENANT}/oauth2/v2.0/{leaf}",
            self.authority_host
        )
    }

    /// Run a device-code sign-in for `scope`, blocking until it completes.
    pub fn sign_in(&self, scope: &str, operator: &mut dyn Operator) -> Result<TokenResponse> {
        let scopes = format!("{scope} offline_access");
        let code: DeviceCode = self
            .http
            .post_form(
                &self.endpoint("devicecode"),
                &[("client_id", self.client_id.as_str()), ("scope", scopes.as_str())],
            )?
            .error_for_status("device code request")?
            .json()
            .context("parse device code response")?;

        operator.notify(&code.message.clone().unwrap_or_else(|| {
            format!(
                "To sign in, open {} and enter the code {} to authenticate.",
                code.verification_uri, code.user_code
            )
        }));
        tracing::info!(scope, "waiting for device code sign-in");

        let deadline = Instant::now() + Duration::from_secs(code.expires_in);
        let mut interval =
            Duration::from_secs(code.interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS).max(1));
        let token_url = self.endpoint("token");
        loop {
            thread::sleep(interval);
            if Instant::now() >= deadline {
                bail!("device code expired before sign-in completed");
            }
            let response = self.http.post_form(
                &token_url,
                &[
                    ("grant_type", DEVICE_CODE_GRANT),
                    ("client_id", self.client_id.as_str()),
                    ("device_code", code.device_code.as_str()),
                ],
            )?;
            match classify_token_response(response)? {
                PollState::Pending => {}
                PollState::SlowDown => interval += Duration::from_secs(SLOW_DOWN_INCREMENT_SECS),
                PollState::Done(token) => {
                    tracing::info!(scope, "sign-in completed");
                    return Ok(token);
                }
            }
        }
    }

    /// Exchange a refresh token for an access token to another resource.
    pub fn redeem_refresh_token(&self, refresh_token: &str, scope: &str) -> Result<TokenResponse> {
        let response = self.http.post_form(
            &self.endpoint("token"),
            &[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("refresh_token", refresh_token),
                ("scope", scope),
            ],
        )?;
        match classify_token_response(response)? {
            PollState::Done(token) => Ok(token),
            state => Err(anyhow!("unexpected token state {state:?} for refresh grant")),
        }
    }
}

fn classify_token_response(response: RawResponse) -> Result<PollState> {
    if response.is_success() {
        let token: TokenResponse = response.json().context("parse token response")?;
        return Ok(PollState::Done(token));
    }
    let Ok(error) = response.json::<TokenError>() else {
        response.error_for_status("token request")?;
        bail!("token request failed with HTTP error");
    };
    let detail = error.error_description.unwrap_or_default();
    match error.error.as_str() {
        "authorization_pending" => Ok(PollState::Pending),
        "slow_down" => Ok(PollState::SlowDown),
        "authorization_declined" => bail!("sign-in was declined by the user"),
        "expired_token" => bail!("device code expired before sign-in completed"),
        other => bail!("token request failed ({other}): {}", detail.trim()),
    }
}
