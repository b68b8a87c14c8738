//! Environment preparation: make the service profiles available.
//!
//! A fault on one component is reported and the built-in profile is used in
//! its place; the run continues.
use crate::components::{
    ComponentStore, ImportedComponent, ServiceProfile, COMPLIANCE_COMPONENT,
    TENANT_ADMIN_COMPONENT,
};
use crate::operator::Operator;
use anyhow::Result;

/// Profiles the sessions are opened with.
#[derive(Debug, Clone)]
pub struct Profiles {
    pub compliance: ServiceProfile,
    pub tenant_admin: ServiceProfile,
}

pub fn prepare_environment(
    store: &mut dyn ComponentStore,
    disable_name_checking: bool,
    operator: &mut dyn Operator,
) -> Result<Profiles> {
    let compliance = prepare_component(store, COMPLIANCE_COMPONENT, disable_name_checking, operator)?;
    let tenant_admin =
        prepare_component(store, TENANT_ADMIN_COMPONENT, disable_name_checking, operator)?;
    Ok(Profiles {
        compliance,
        tenant_admin,
    })
}

fn prepare_component(
    store: &mut dyn ComponentStore,
    name: &str,
    disable_name_checking: bool,
    operator: &mut dyn Operator,
) -> Result<ServiceProfile> {
    match install_or_import(store, name, operator) {
        Ok(imported) => {
            if !disable_name_checking {
                for warning in &imported.naming_warnings {
                    tracing::warn!(component = name, "{warning}");
                    operator.notify(&format!("WARNING: {warning}"));
                }
            }
            Ok(imported.profile)
        }
        Err(err) => {
            tracing::warn!(component = name, error = %format!("{err:#}"), "component preparation failed");
            operator.notify(&format!(
                "WARNING: could not prepare component {name}: {err:#}. Continuing with the built-in profile."
            ));
            store.builtin(name)
        }
    }
}

fn install_or_import(
    store: &mut dyn ComponentStore,
    name: &str,
    operator: &mut dyn Operator,
) -> Result<ImportedComponent> {
    if !store.is_installed(name) {
        operator.notify(&format!("Component {name} not found locally. Installing..."));
        store.install(name)?;
    }
    store.import(name)
}
