//! Compliance label session over Microsoft Graph.
use super::http::{odata_literal, Http};
use crate::model::{LabelId, SensitivityLabel};
use crate::services::LabelCatalog;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

const LABELS_PATH: &str = "/beta/security/informationProtection/sensitivityLabels";
const ME_PATH: &str = "/v1.0/me";

#[derive(Debug, Deserialize)]
struct Page<T> {
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink", default)]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LabelEntry {
    name: String,
    #[serde(default)]
    content_formats: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LabelIdEntry {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Me {
    user_principal_name: String,
}

pub struct GraphLabelCatalog {
    http: Http,
    base_url: String,
}

impl GraphLabelCatalog {
    pub fn new(http: Http, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn labels_url(&self) -> String {
        format!("{}{LABELS_PATH}", self.base_url)
    }

    /// Fail unless the session belongs to `user_principal_name`.
    pub fn verify_identity(&self, user_principal_name: &str) -> Result<()> {
        let me: Me = self
            .http
            .get(
                &format!("{}{ME_PATH}", self.base_url),
                &[("$select", "userPrincipalName")],
            )?
            .error_for_status("read signed-in user")?
            .json()
            .context("parse signed-in user")?;
        check_identity(&me.user_principal_name, user_principal_name)
    }
}

fn check_identity(signed_in: &str, requested: &str) -> Result<()> {
    if signed_in.trim().eq_ignore_ascii_case(requested.trim()) {
        Ok(())
    } else {
        Err(anyhow!(
            "signed in as {signed_in}, but the run was started for {requested}"
        ))
    }
}

fn to_label(entry: LabelEntry) -> SensitivityLabel {
    SensitivityLabel::named(&entry.name, &entry.content_formats.join(", "))
}

impl LabelCatalog for GraphLabelCatalog {
    fn list_labels(&mut self) -> Result<Vec<SensitivityLabel>> {
        let mut labels = Vec::new();
        let mut page: Page<LabelEntry> = self
            .http
            .get(&self.labels_url(), &[("$select", "name,contentFormats")])?
            .error_for_status("list sensitivity labels")?
            .json()
            .context("parse sensitivity labels")?;
        loop {
            labels.extend(page.value.into_iter().map(to_label));
            let Some(next) = page.next_link else {
                break;
            };
            page = self
                .http
                .get(&next, &[])?
                .error_for_status("list sensitivity labels")?
                .json()
                .context("parse sensitivity labels")?;
        }
        tracing::info!(count = labels.len(), "listed sensitivity labels");
        Ok(labels)
    }

    fn resolve_label_id(&mut self, handle: &str) -> Result<LabelId> {
        let filter = format!("name eq {}", odata_literal(handle));
        let page: Page<LabelIdEntry> = self
            .http
            .get(
                &self.labels_url(),
                &[("$filter", filter.as_str()), ("$select", "id,name")],
            )?
            .error_for_status("resolve sensitivity label")?
            .json()
            .context("parse sensitivity label lookup")?;
        page.value
            .into_iter()
            .find(|entry| entry.name == handle)
            .map(|entry| LabelId(entry.id))
            .ok_or_else(|| anyhow!("sensitivity label {handle:?} was not found"))
    }
}
