//! Blocking JSON-over-HTTPS helpers shared by the remote sessions.
use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use ureq::Agent;

/// Raw status and body of a response, for callers that branch on errors.
#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).context("parse response JSON")
    }

    /// Fail with the service's own message when the status is not 2xx.
    pub fn error_for_status(self, what: &str) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        let detail = service_error_message(&self.body)
            .unwrap_or_else(|| truncate(self.body.trim(), 300));
        Err(anyhow!("{what} failed with HTTP {}: {detail}", self.status))
    }
}

/// Authenticated HTTP client for one session.
#[derive(Clone)]
pub struct Http {
    agent: Agent,
    bearer: Option<String>,
}

impl Http {
    pub fn new(timeout: Duration) -> Self {
        // Non-2xx statuses are returned as responses so error bodies can be read.
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            bearer: None,
        }
    }

    pub fn with_bearer(&self, token: &str) -> Self {
        Self {
            agent: self.agent.clone(),
            bearer: Some(format!("Bearer {token}")),
        }
    }

    pub fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<RawResponse> {
        tracing::debug!(method = "GET", url, "request");
        let mut request = self.agent.get(url).header("Accept", "application/json");
        if let Some(bearer) = &self.bearer {
            request = request.header("Authorization", bearer.as_str());
        }
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        let response = request.call().with_context(|| format!("GET {url}"))?;
        read_response(response)
    }

    pub fn patch_json<B: Serialize>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<RawResponse> {
        tracing::debug!(method = "PATCH", url, "request");
        let mut request = self.agent.patch(url).header("Accept", "application/json");
        if let Some(bearer) = &self.bearer {
            request = request.header("Authorization", bearer.as_str());
        }
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        let response = request.send_json(body).with_context(|| format!("PATCH {url}"))?;
        read_response(response)
    }

    pub fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<RawResponse> {
        tracing::debug!(method = "POST", url, "request");
        let response = self
            .agent
            .post(url)
            .header("Accept", "application/json")
            .send_form(form.iter().copied())
            .with_context(|| format!("POST {url}"))?;
        read_response(response)
    }
}

fn read_response(mut response: ureq::http::Response<ureq::Body>) -> Result<RawResponse> {
    let status = response.status().as_u16();
    let body = response
        .body_mut()
        .read_to_string()
        .context("read response body")?;
    tracing::debug!(status, bytes = body.len(), "response");
    Ok(RawResponse { status, body })
}

/// Extract a human-readable message from Graph, SharePoint, or identity errors.
pub fn service_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let candidates = [
        value.pointer("/error/message"),
        value.pointer("/error/message/value"),
        value.pointer("/odata.error/message/value"),
        value.get("error_description"),
        value.get("error"),
    ];
    for candidate in candidates.into_iter().flatten() {
        if let Some(text) = candidate.as_str().map(str::trim) {
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}

/// Quote a string for an OData `$filter` literal.
pub fn odata_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
