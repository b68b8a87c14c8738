//! SharePoint Online tenant-administration session.
use super::http::Http;
use crate::model::{LabelId, TenantFeature, TenantFeatureFlags};
use crate::services::TenantAdmin;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Map, Value};

const TENANT_PATH: &str = "/_api/SPO.Tenant";
const SITE_PROPERTIES_PATH: &str = "/_api/SPO.Tenant/SiteProperties";

#[derive(Debug, Deserialize)]
struct SiteLabel {
    #[serde(rename = "SensitivityLabel", default)]
    sensitivity_label: Option<String>,
}

pub struct SpoTenantAdmin {
    http: Http,
    admin_url: String,
}

impl SpoTenantAdmin {
    pub fn new(http: Http, admin_url: &str) -> Self {
        Self {
            http,
            admin_url: admin_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.admin_url)
    }
}

fn flag_patch(feature: TenantFeature, enabled: bool) -> Value {
    let mut body = Map::new();
    body.insert(feature.property().to_string(), Value::Bool(enabled));
    Value::Object(body)
}

fn site_label(body: SiteLabel) -> Option<LabelId> {
    body.sensitivity_label
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .map(LabelId)
}

impl TenantAdmin for SpoTenantAdmin {
    fn tenant_flags(&mut self) -> Result<TenantFeatureFlags> {
        let select = format!(
            "{},{}",
            TenantFeature::AipIntegration.property(),
            TenantFeature::PdfSensitivityLabeling.property()
        );
        self.http
            .get(&self.url(TENANT_PATH), &[("$select", select.as_str())])?
            .error_for_status("read tenant settings")?
            .json()
            .context("parse tenant settings")
    }

    fn set_flag(&mut self, feature: TenantFeature, enabled: bool) -> Result<()> {
        tracing::info!(property = feature.property(), enabled, "updating tenant setting");
        self.http
            .patch_json(&self.url(TENANT_PATH), &[], &flag_patch(feature, enabled))?
            .error_for_status(&format!("set {}", feature.property()))?;
        Ok(())
    }

    fn set_site_default_label(&mut self, site_url: &str, label_id: &LabelId) -> Result<()> {
        tracing::info!(site_url, label_id = %label_id, "assigning site sensitivity label");
        self.http
            .patch_json(
                &self.url(SITE_PROPERTIES_PATH),
                &[("url", site_url)],
                &json!({ "SensitivityLabel": label_id.0 }),
            )?
            .error_for_status("set site sensitivity label")?;
        Ok(())
    }

    fn site_default_label(&mut self, site_url: &str) -> Result<Option<LabelId>> {
        let body: SiteLabel = self
            .http
            .get(
                &self.url(SITE_PROPERTIES_PATH),
                &[("url", site_url), ("$select", "SensitivityLabel")],
            )?
            .error_for_status("read site sensitivity label")?
            .json()
            .context("parse site properties")?;
        Ok(site_label(body))
    }
}
