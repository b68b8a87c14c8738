//! Tenant feature gate.
//!
//! One machine per feature: `Unknown -> Enabled`, or
//! `Unknown -> PromptedForChange -> Enabled | Declined`. A flag that still
//! reads `false` after the enable call is the fatal branch and surfaces as an
//! error. The flag is only written after the operator confirms.
use crate::model::TenantFeature;
use crate::operator::{is_affirmative, Operator};
use crate::services::TenantAdmin;
use anyhow::{bail, Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Unknown,
    PromptedForChange,
    Enabled,
    Declined,
}

/// Drive the gate for `feature` to a terminal state.
pub fn ensure_feature(
    admin: &mut dyn TenantAdmin,
    feature: TenantFeature,
    operator: &mut dyn Operator,
) -> Result<GateState> {
    let mut state = GateState::Unknown;
    loop {
        state = match state {
            GateState::Unknown => {
                let enabled = read_flag(admin, feature)?;
                tracing::info!(feature = feature.property(), enabled, "tenant setting");
                if enabled {
                    GateState::Enabled
                } else {
                    GateState::PromptedForChange
                }
            }
            GateState::PromptedForChange => {
                operator.notify(&format!("{feature} is disabled for this tenant."));
                let answer = operator.ask(&format!("Do you want to enable {feature}? (y/n)"))?;
                if !is_affirmative(&answer) {
                    operator.notify(&format!(
                        "{feature} must be enabled before a default sensitivity label can be applied. Exiting."
                    ));
                    GateState::Declined
                } else {
                    admin
                        .set_flag(feature, true)
                        .with_context(|| format!("enable {}", feature.property()))?;
                    if !read_flag(admin, feature)? {
                        bail!("{} flag failed to set", feature.property());
                    }
                    operator.notify(&format!("{feature} enabled."));
                    GateState::Enabled
                }
            }
            GateState::Enabled | GateState::Declined => return Ok(state),
        };
    }
}

fn read_flag(admin: &mut dyn TenantAdmin, feature: TenantFeature) -> Result<bool> {
    let flags = admin
        .tenant_flags()
        .with_context(|| format!("read {}", feature.property()))?;
    Ok(flags.get(feature))
}
