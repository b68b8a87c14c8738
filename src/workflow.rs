//! The label-default workflow.
//!
//! Phases run in order and each one either hands the next phase what it
//! needs or ends the run:
//!
//! 1. environment: install/import service profiles (faults fall back to
//!    built-in profiles)
//! 2. sessions: compliance and tenant admin (faults are fatal)
//! 3. feature gate: AIP integration, then PDF labeling
//! 4. selection: list labels, prompt once, resolve the durable id
//! 5. application: set the site default, optionally read it back
//!
//! Graceful stops are returned as [`Outcome::Aborted`]; anything that makes
//! the remaining phases meaningless is an error.
mod environment;
mod gate;
mod selection;

use crate::components::ComponentStore;
use crate::model::{AbortReason, Assignment, Outcome, SiteTarget, TenantFeature};
use crate::operator::Operator;
use crate::services::{Connector, LabelCatalog, TenantAdmin};
use anyhow::{bail, Context, Result};

pub use environment::{prepare_environment, Profiles};
pub use gate::{ensure_feature, GateState};
pub use selection::{choose_label, Choice, SelectedLabel};

/// Inputs for one run.
#[derive(Debug, Clone)]
pub struct Request {
    pub user_principal_name: String,
    pub target: SiteTarget,
    pub disable_name_checking: bool,
    pub verify_assignment: bool,
}

/// Capabilities the workflow drives; real or scripted.
pub struct Collaborators<'a> {
    pub components: &'a mut dyn ComponentStore,
    pub connector: &'a mut dyn Connector,
    pub operator: &'a mut dyn Operator,
}

/// Open sessions handed to the later phases.
pub struct Sessions {
    pub catalog: Box<dyn LabelCatalog>,
    pub admin: Box<dyn TenantAdmin>,
}

pub fn run(request: &Request, collaborators: Collaborators<'_>) -> Result<Outcome> {
    let Collaborators {
        components,
        connector,
        operator,
    } = collaborators;

    let profiles = prepare_environment(components, request.disable_name_checking, operator)?;
    let mut sessions = establish_sessions(request, &profiles, connector, operator)?;

    for feature in TenantFeature::ALL {
        if ensure_feature(sessions.admin.as_mut(), feature, operator)? == GateState::Declined {
            return Ok(Outcome::Aborted(AbortReason::FeatureDeclined(feature)));
        }
    }

    let selected = match choose_label(sessions.catalog.as_mut(), operator)? {
        Choice::Selected(selected) => selected,
        Choice::Abort(reason) => return Ok(Outcome::Aborted(reason)),
    };

    let assignment = apply_label(
        sessions.admin.as_mut(),
        &request.target,
        selected,
        request.verify_assignment,
        operator,
    )?;
    Ok(Outcome::Applied(assignment))
}

pub fn establish_sessions(
    request: &Request,
    profiles: &Profiles,
    connector: &mut dyn Connector,
    operator: &mut dyn Operator,
) -> Result<Sessions> {
    let upn = request.user_principal_name.as_str();
    operator.notify(&format!("Connecting to the compliance center as {upn}..."));
    let catalog = connector
        .connect_compliance(upn, &profiles.compliance, operator)
        .context("connect to the compliance center")?;

    let admin_url = profiles.tenant_admin.endpoint(&request.target.tenant_name);
    operator.notify(&format!("Connecting to SharePoint Online at {admin_url}..."));
    let admin = connector
        .connect_tenant_admin(&admin_url, &profiles.tenant_admin, operator)
        .with_context(|| format!("connect to SharePoint Online admin {admin_url}"))?;
    operator.notify("Connected.");
    Ok(Sessions { catalog, admin })
}

/// Set the site's default label; read it back when `verify` is set.
pub fn apply_label(
    admin: &mut dyn TenantAdmin,
    target: &SiteTarget,
    selected: SelectedLabel,
    verify: bool,
    operator: &mut dyn Operator,
) -> Result<Assignment> {
    let site_url = target.site_url();
    let SelectedLabel { label, label_id } = selected;
    operator.notify(&format!(
        "Applying sensitivity label '{}' to {site_url}...",
        label.display_name
    ));
    admin
        .set_site_default_label(&site_url, &label_id)
        .with_context(|| format!("set default sensitivity label on {site_url}"))?;

    if verify {
        let current = admin
            .site_default_label(&site_url)
            .with_context(|| format!("read back sensitivity label of {site_url}"))?;
        if current.as_ref() != Some(&label_id) {
            let found = current.map_or_else(|| "no label".to_string(), |id| id.to_string());
            bail!("{site_url} reports {found} after assigning label {label_id}");
        }
        tracing::info!(site_url = %site_url, label_id = %label_id, "assignment verified");
    }

    operator.notify(&format!(
        "Default sensitivity label '{}' applied to {site_url}.",
        label.display_name
    ));
    Ok(Assignment {
        site_url,
        label,
        label_id,
        verified: verify,
    })
}

#[cfg(test)]
mod tests;
