//! HTTP-backed sessions for the label and tenant-administration services.
//!
//! One device-code sign-in opens the compliance session; its refresh token is
//! redeemed for the tenant admin resource so the operator is prompted once.
mod auth;
mod graph;
mod http;
mod spo;

use crate::components::ServiceProfile;
use crate::config::Config;
use crate::operator::Operator;
use crate::services::{Connector, LabelCatalog, TenantAdmin};
use anyhow::{Context, Result};
use auth::{DeviceCodeAuth, TokenResponse};
use graph::GraphLabelCatalog;
use http::Http;
use spo::SpoTenantAdmin;
use std::time::Duration;

pub struct RemoteConnector {
    http: Http,
    auth: DeviceCodeAuth,
    refresh_token: Option<String>,
}

impl RemoteConnector {
    pub fn new(config: &Config) -> Self {
        let http = Http::new(Duration::from_secs(config.http_timeout_secs));
        let auth = DeviceCodeAuth::new(http.clone(), &config.authority_host, &config.client_id);
        Self {
            http,
            auth,
            refresh_token: None,
        }
    }

    fn remember(&mut self, token: &TokenResponse) {
        if let Some(refresh) = &token.refresh_token {
            self.refresh_token = Some(refresh.clone());
        }
    }

    /// Token for `scope`, reusing an earlier sign-in when possible.
    fn token_for(&mut self, scope: &str, operator: &mut dyn Operator) -> Result<TokenResponse> {
        if let Some(refresh) = self.refresh_token.clone() {
            match self.auth.redeem_refresh_token(&refresh, scope) {
                Ok(token) => return Ok(token),
                Err(err) => {
                    tracing::warn!(scope, error = %err, "refresh grant failed; signing in again");
                }
            }
        }
        self.auth.sign_in(scope, operator)
    }
}

impl Connector for RemoteConnector {
    fn connect_compliance(
        &mut self,
        user_principal_name: &str,
        profile: &ServiceProfile,
        operator: &mut dyn Operator,
    ) -> Result<Box<dyn LabelCatalog>> {
        let endpoint = profile.base();
        let scope = profile.scope_for(&endpoint);
        let token = self
            .token_for(&scope, operator)
            .with_context(|| format!("sign in to {endpoint}"))?;
        self.remember(&token);
        let session = GraphLabelCatalog::new(self.http.with_bearer(&token.access_token), &endpoint);
        session.verify_identity(user_principal_name)?;
        tracing::info!(user_principal_name, endpoint = %endpoint, "compliance session open");
        Ok(Box::new(session))
    }

    fn connect_tenant_admin(
        &mut self,
        admin_url: &str,
        profile: &ServiceProfile,
        operator: &mut dyn Operator,
    ) -> Result<Box<dyn TenantAdmin>> {
        let scope = profile.scope_for(admin_url);
        let token = self
            .token_for(&scope, operator)
            .with_context(|| format!("sign in to {admin_url}"))?;
        self.remember(&token);
        tracing::info!(admin_url, "tenant admin session open");
        Ok(Box::new(SpoTenantAdmin::new(
            self.http.with_bearer(&token.access_token),
            admin_url,
        )))
    }
}
