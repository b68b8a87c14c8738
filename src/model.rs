//! Transient entities shared by the workflow and the remote services.
//!
//! Nothing here is persisted by the tool; tenant flags and the site label
//! live in the remote services.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default SharePoint Online domain suffix.
pub const DEFAULT_SHAREPOINT_DOMAIN: &str = "sharepoint.com";

/// Tenant settings that must be enabled before labels can be assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantFeature {
    AipIntegration,
    PdfSensitivityLabeling,
}

impl TenantFeature {
    /// Gate order: AIP integration first, then PDF labeling.
    pub const ALL: [TenantFeature; 2] = [
        TenantFeature::AipIntegration,
        TenantFeature::PdfSensitivityLabeling,
    ];

    /// Property name on the SharePoint tenant object.
    pub fn property(self) -> &'static str {
        match self {
            Self::AipIntegration => "EnableAIPIntegration",
            Self::PdfSensitivityLabeling => "EnableSensitivityLabelforPDF",
        }
    }
}

impl fmt::Display for TenantFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AipIntegration => write!(f, "AIP integration"),
            Self::PdfSensitivityLabeling => write!(f, "PDF sensitivity labeling"),
        }
    }
}

/// Snapshot of the two tenant feature flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TenantFeatureFlags {
    #[serde(rename = "EnableAIPIntegration")]
    pub aip_integration: bool,
    #[serde(rename = "EnableSensitivityLabelforPDF")]
    pub pdf_sensitivity_labeling: bool,
}

impl TenantFeatureFlags {
    pub fn get(&self, feature: TenantFeature) -> bool {
        match feature {
            TenantFeature::AipIntegration => self.aip_integration,
            TenantFeature::PdfSensitivityLabeling => self.pdf_sensitivity_labeling,
        }
    }
}

/// A catalog entry as listed by the label service.
///
/// Entries carry no durable id; `handle` is the key used to resolve one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensitivityLabel {
    pub handle: String,
    pub display_name: String,
    pub content_type: String,
}

impl SensitivityLabel {
    /// Entry whose lookup handle is its display name.
    pub fn named(display_name: &str, content_type: &str) -> Self {
        Self {
            handle: display_name.to_string(),
            display_name: display_name.to_string(),
            content_type: content_type.to_string(),
        }
    }
}

/// Durable label identifier (a GUID in practice, opaque here).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelId(pub String);

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Site whose default label is being set.
///
/// Existence is never checked locally; the admin service reports bad targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteTarget {
    pub tenant_name: String,
    pub site_name: String,
    pub domain: String,
}

impl SiteTarget {
    pub fn with_domain(tenant_name: &str, site_name: &str, domain: &str) -> Self {
        Self {
            tenant_name: tenant_name.trim().to_string(),
            site_name: site_name.trim().trim_matches('/').to_string(),
            domain: domain.trim().trim_matches('.').to_string(),
        }
    }

    /// `https://{tenant}.sharepoint.com/sites/{site}`
    pub fn site_url(&self) -> String {
        format!(
            "https://{}.{}/sites/{}",
            self.tenant_name, self.domain, self.site_name
        )
    }
}

/// A completed default-label assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub site_url: String,
    pub label: SensitivityLabel,
    pub label_id: LabelId,
    /// Whether the assignment was read back and matched.
    pub verified: bool,
}

/// Why a run stopped early without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    FeatureDeclined(TenantFeature),
    EmptyCatalog,
    InvalidSelection(String),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FeatureDeclined(feature) => write!(f, "{feature} was not enabled"),
            Self::EmptyCatalog => write!(f, "no sensitivity labels exist"),
            Self::InvalidSelection(input) => write!(f, "invalid choice {input:?}"),
        }
    }
}

/// Terminal state of a workflow run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied(Assignment),
    Aborted(AbortReason),
}
