//! Collaborator contracts consumed by the workflow.
//!
//! Each remote system sits behind a trait so the workflow only ever sees
//! explicit session handles. `remote` provides the HTTP-backed versions;
//! tests provide in-memory ones.
use crate::components::ServiceProfile;
use crate::model::{LabelId, SensitivityLabel, TenantFeature, TenantFeatureFlags};
use crate::operator::Operator;
use anyhow::Result;

/// Session to the compliance-center label service.
pub trait LabelCatalog {
    /// All organizational labels, in service order.
    fn list_labels(&mut self) -> Result<Vec<SensitivityLabel>>;

    /// Look up the durable id for a catalog entry's handle.
    fn resolve_label_id(&mut self, handle: &str) -> Result<LabelId>;
}

/// Session to the SharePoint tenant-administration service.
pub trait TenantAdmin {
    fn tenant_flags(&mut self) -> Result<TenantFeatureFlags>;

    fn set_flag(&mut self, feature: TenantFeature, enabled: bool) -> Result<()>;

    fn set_site_default_label(&mut self, site_url: &str, label_id: &LabelId) -> Result<()>;

    /// Current default label of a site, if any.
    fn site_default_label(&mut self, site_url: &str) -> Result<Option<LabelId>>;
}

/// Opens authenticated sessions.
///
/// The operator is passed through because sign-in may need interaction.
pub trait Connector {
    fn connect_compliance(
        &mut self,
        user_principal_name: &str,
        profile: &ServiceProfile,
        operator: &mut dyn Operator,
    ) -> Result<Box<dyn LabelCatalog>>;

    fn connect_tenant_admin(
        &mut self,
        admin_url: &str,
        profile: &ServiceProfile,
        operator: &mut dyn Operator,
    ) -> Result<Box<dyn TenantAdmin>>;
}
