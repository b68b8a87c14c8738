use super::{run, Collaborators, Request};
use crate::components::{
    ComponentStore, ImportedComponent, ServiceProfile, COMPLIANCE_COMPONENT,
    TENANT_ADMIN_COMPONENT,
};
use crate::config::default_config;
use crate::model::{
    AbortReason, LabelId, Outcome, SensitivityLabel, SiteTarget, TenantFeature,
    TenantFeatureFlags, DEFAULT_SHAREPOINT_DOMAIN,
};
use crate::operator::Operator;
use crate::services::{Connector, LabelCatalog, TenantAdmin};
use anyhow::{anyhow, bail, Result};
use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::rc::Rc;

#[derive(Debug, Default)]
struct Calls {
    connects: Vec<String>,
    flag_reads: usize,
    flag_writes: Vec<(TenantFeature, bool)>,
    catalog_lists: usize,
    resolves: Vec<String>,
    assignments: Vec<(String, LabelId)>,
    read_backs: usize,
}

type Shared = Rc<RefCell<Calls>>;

struct FakeTenant {
    calls: Shared,
    flags: TenantFeatureFlags,
    /// Enable calls are acknowledged but never take effect.
    stuck: bool,
    site_label: Option<LabelId>,
    /// Read-back returns this instead of the stored label.
    read_back_override: Option<Option<LabelId>>,
    fail_assignment: bool,
}

impl TenantAdmin for FakeTenant {
    fn tenant_flags(&mut self) -> Result<TenantFeatureFlags> {
        self.calls.borrow_mut().flag_reads += 1;
        Ok(self.flags)
    }

    fn set_flag(&mut self, feature: TenantFeature, enabled: bool) -> Result<()> {
        self.calls.borrow_mut().flag_writes.push((feature, enabled));
        if !self.stuck {
            match feature {
                TenantFeature::AipIntegration => self.flags.aip_integration = enabled,
                TenantFeature::PdfSensitivityLabeling => {
                    self.flags.pdf_sensitivity_labeling = enabled
                }
            }
        }
        Ok(())
    }

    fn set_site_default_label(&mut self, site_url: &str, label_id: &LabelId) -> Result<()> {
        self.calls
            .borrow_mut()
            .assignments
            .push((site_url.to_string(), label_id.clone()));
        if self.fail_assignment {
            bail!("Access denied. You do not have permission to perform this action.");
        }
        self.site_label = Some(label_id.clone());
        Ok(())
    }

    fn site_default_label(&mut self, _site_url: &str) -> Result<Option<LabelId>> {
        self.calls.borrow_mut().read_backs += 1;
        Ok(self
            .read_back_override
            .clone()
            .unwrap_or_else(|| self.site_label.clone()))
    }
}

struct FakeCatalog {
    calls: Shared,
    labels: Vec<SensitivityLabel>,
    fail_resolve: bool,
}

impl LabelCatalog for FakeCatalog {
    fn list_labels(&mut self) -> Result<Vec<SensitivityLabel>> {
        self.calls.borrow_mut().catalog_lists += 1;
        Ok(self.labels.clone())
    }

    fn resolve_label_id(&mut self, handle: &str) -> Result<LabelId> {
        self.calls.borrow_mut().resolves.push(handle.to_string());
        if self.fail_resolve {
            bail!("sensitivity label {handle:?} was not found");
        }
        Ok(LabelId(format!("id-{handle}")))
    }
}

struct FakeConnector {
    calls: Shared,
    catalog: Option<FakeCatalog>,
    tenant: Option<FakeTenant>,
    fail_compliance: bool,
}

impl Connector for FakeConnector {
    fn connect_compliance(
        &mut self,
        user_principal_name: &str,
        profile: &ServiceProfile,
        _operator: &mut dyn Operator,
    ) -> Result<Box<dyn LabelCatalog>> {
        self.calls
            .borrow_mut()
            .connects
            .push(format!("{user_principal_name}@{}", profile.base()));
        if self.fail_compliance {
            bail!("AADSTS50126: invalid username or password");
        }
        let catalog = self.catalog.take().ok_or_else(|| anyhow!("already connected"))?;
        Ok(Box::new(catalog))
    }

    fn connect_tenant_admin(
        &mut self,
        admin_url: &str,
        _profile: &ServiceProfile,
        _operator: &mut dyn Operator,
    ) -> Result<Box<dyn TenantAdmin>> {
        self.calls.borrow_mut().connects.push(admin_url.to_string());
        let tenant = self.tenant.take().ok_or_else(|| anyhow!("already connected"))?;
        Ok(Box::new(tenant))
    }
}

#[derive(Default)]
struct ScriptedOperator {
    answers: VecDeque<String>,
    messages: Vec<String>,
    prompts: Vec<String>,
}

impl Operator for ScriptedOperator {
    fn notify(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        self.prompts.push(prompt.to_string());
        Ok(self.answers.pop_front().unwrap_or_default())
    }
}

#[derive(Default)]
struct FakeComponents {
    installed: BTreeSet<String>,
    installs: Vec<String>,
    fail_import: bool,
    profile_name_override: Option<String>,
}

impl ComponentStore for FakeComponents {
    fn is_installed(&self, name: &str) -> bool {
        self.installed.contains(name)
    }

    fn install(&mut self, name: &str) -> Result<()> {
        self.installs.push(name.to_string());
        self.installed.insert(name.to_string());
        Ok(())
    }

    fn import(&mut self, name: &str) -> Result<ImportedComponent> {
        if self.fail_import {
            bail!("profile for {name} is corrupt");
        }
        let mut profile = self.builtin(name)?;
        if let Some(alias) = &self.profile_name_override {
            profile.name = alias.clone();
        }
        Ok(ImportedComponent {
            naming_warnings: crate::components::naming_warnings(&profile.name),
            profile,
        })
    }

    fn builtin(&self, name: &str) -> Result<ServiceProfile> {
        ServiceProfile::builtin(name, &default_config())
    }
}

struct Harness {
    calls: Shared,
    connector: FakeConnector,
    components: FakeComponents,
    operator: ScriptedOperator,
    request: Request,
}

impl Harness {
    fn new(flags: (bool, bool), labels: &[(&str, &str)], answers: &[&str]) -> Self {
        let calls: Shared = Rc::default();
        let catalog = FakeCatalog {
            calls: Rc::clone(&calls),
            labels: labels
                .iter()
                .map(|(name, content)| SensitivityLabel::named(name, content))
                .collect(),
            fail_resolve: false,
        };
        let tenant = FakeTenant {
            calls: Rc::clone(&calls),
            flags: TenantFeatureFlags {
                aip_integration: flags.0,
                pdf_sensitivity_labeling: flags.1,
            },
            stuck: false,
            site_label: None,
            read_back_override: None,
            fail_assignment: false,
        };
        let mut components = FakeComponents::default();
        for name in [COMPLIANCE_COMPONENT, TENANT_ADMIN_COMPONENT] {
            components.installed.insert(name.to_string());
        }
        Self {
            connector: FakeConnector {
                calls: Rc::clone(&calls),
                catalog: Some(catalog),
                tenant: Some(tenant),
                fail_compliance: false,
            },
            calls,
            components,
            operator: ScriptedOperator {
                answers: answers.iter().map(|a| a.to_string()).collect(),
                ..ScriptedOperator::default()
            },
            request: Request {
                user_principal_name: "admin@contoso.onmicrosoft.com".to_string(),
                target: SiteTarget::with_domain("Contoso", "Finance", DEFAULT_SHAREPOINT_DOMAIN),
                disable_name_checking: true,
                verify_assignment: false,
            },
        }
    }

    fn tenant(&mut self) -> &mut FakeTenant {
        self.connector.tenant.as_mut().expect("tenant not yet connected")
    }

    fn catalog(&mut self) -> &mut FakeCatalog {
        self.connector.catalog.as_mut().expect("catalog not yet connected")
    }

    fn run(&mut self) -> Result<Outcome> {
        run(
            &self.request,
            Collaborators {
                components: &mut self.components,
                connector: &mut self.connector,
                operator: &mut self.operator,
            },
        )
    }

    fn said(&self, needle: &str) -> bool {
        self.operator.messages.iter().any(|m| m.contains(needle))
    }
}

const THREE_LABELS: [(&str, &str); 3] = [
    ("Public", "file"),
    ("General", "file, email"),
    ("Confidential", "file, email, site"),
];

#[test]
fn scenario_a_applies_selected_label_to_site() {
    let mut harness = Harness::new((true, true), &[("Confidential", "Word")], &["1"]);
    let outcome = harness.run().expect("run succeeds");

    let Outcome::Applied(assignment) = outcome else {
        panic!("expected an applied outcome");
    };
    assert_eq!(assignment.site_url, "https://Contoso.sharepoint.com/sites/Finance");
    assert_eq!(assignment.label_id, LabelId("id-Confidential".to_string()));
    assert!(!assignment.verified);

    let calls = harness.calls.borrow();
    assert_eq!(calls.resolves, vec!["Confidential".to_string()]);
    assert_eq!(
        calls.assignments,
        vec![(
            "https://Contoso.sharepoint.com/sites/Finance".to_string(),
            LabelId("id-Confidential".to_string())
        )]
    );
    assert!(calls.flag_writes.is_empty());
    assert_eq!(calls.read_backs, 0);
    assert_eq!(
        calls.connects,
        vec![
            "admin@contoso.onmicrosoft.com@https://graph.microsoft.com".to_string(),
            "https://Contoso-admin.sharepoint.com".to_string(),
        ]
    );
    assert!(harness.said("1. Confidential - Word"));
}

#[test]
fn scenario_b_declining_stops_before_catalog() {
    let mut harness = Harness::new((false, true), &THREE_LABELS, &["n"]);
    let outcome = harness.run().expect("decline is not an error");

    assert_eq!(
        outcome,
        Outcome::Aborted(AbortReason::FeatureDeclined(TenantFeature::AipIntegration))
    );
    let calls = harness.calls.borrow();
    assert_eq!(calls.flag_reads, 1, "second flag must not be queried");
    assert!(calls.flag_writes.is_empty());
    assert_eq!(calls.catalog_lists, 0);
    assert!(calls.resolves.is_empty());
    assert!(calls.assignments.is_empty());
    assert!(harness.said("must be enabled"));
}

#[test]
fn scenario_c_non_numeric_selection_aborts() {
    let mut harness = Harness::new((true, true), &THREE_LABELS, &["abc"]);
    let outcome = harness.run().expect("invalid choice is not an error");

    assert_eq!(
        outcome,
        Outcome::Aborted(AbortReason::InvalidSelection("abc".to_string()))
    );
    assert!(harness.said("Invalid choice"));
    let calls = harness.calls.borrow();
    assert_eq!(calls.catalog_lists, 1);
    assert!(calls.resolves.is_empty());
    assert!(calls.assignments.is_empty());
}

#[test]
fn out_of_range_selections_never_resolve_or_assign() {
    for input in ["0", "-1", "4", "", "2.0", "  "] {
        let mut harness = Harness::new((true, true), &THREE_LABELS, &[input]);
        let outcome = harness.run().expect("invalid choice is not an error");
        assert!(
            matches!(outcome, Outcome::Aborted(AbortReason::InvalidSelection(_))),
            "{input:?} -> {outcome:?}"
        );
        let calls = harness.calls.borrow();
        assert!(calls.resolves.is_empty(), "{input:?}");
        assert!(calls.assignments.is_empty(), "{input:?}");
    }
}

#[test]
fn empty_catalog_aborts_before_prompting() {
    let mut harness = Harness::new((true, true), &[], &["1"]);
    let outcome = harness.run().expect("empty catalog is not an error");

    assert_eq!(outcome, Outcome::Aborted(AbortReason::EmptyCatalog));
    assert!(harness.operator.prompts.is_empty());
    assert!(harness.said("Create a sensitivity label"));
    let calls = harness.calls.borrow();
    assert!(calls.flag_writes.is_empty());
    assert!(calls.assignments.is_empty());
}

#[test]
fn enabled_flags_are_not_rewritten() {
    let mut harness = Harness::new((true, true), &THREE_LABELS, &["2"]);
    harness.run().expect("run succeeds");
    let calls = harness.calls.borrow();
    assert!(calls.flag_writes.is_empty());
    assert_eq!(calls.flag_reads, 2);
    assert_eq!(calls.resolves, vec!["General".to_string()]);
}

#[test]
fn confirmed_flags_are_enabled_and_verified() {
    let mut harness = Harness::new((false, false), &THREE_LABELS, &["Y", "yes", "3"]);
    let outcome = harness.run().expect("run succeeds");

    assert!(matches!(outcome, Outcome::Applied(_)));
    let calls = harness.calls.borrow();
    assert_eq!(
        calls.flag_writes,
        vec![
            (TenantFeature::AipIntegration, true),
            (TenantFeature::PdfSensitivityLabeling, true),
        ]
    );
    // Each gate reads once before and once after its write.
    assert_eq!(calls.flag_reads, 4);
    assert_eq!(calls.resolves, vec!["Confidential".to_string()]);
}

#[test]
fn flag_that_does_not_stick_is_fatal() {
    let mut harness = Harness::new((true, false), &THREE_LABELS, &["y", "1"]);
    harness.tenant().stuck = true;
    let err = harness.run().expect_err("stuck flag fails the run");

    assert!(err.to_string().contains("EnableSensitivityLabelforPDF flag failed to set"));
    let calls = harness.calls.borrow();
    assert_eq!(
        calls.flag_writes,
        vec![(TenantFeature::PdfSensitivityLabeling, true)]
    );
    assert_eq!(calls.catalog_lists, 0);
    assert!(calls.assignments.is_empty());
}

#[test]
fn declining_second_flag_leaves_catalog_untouched() {
    let mut harness = Harness::new((true, false), &THREE_LABELS, &["no"]);
    let outcome = harness.run().expect("decline is not an error");
    assert_eq!(
        outcome,
        Outcome::Aborted(AbortReason::FeatureDeclined(
            TenantFeature::PdfSensitivityLabeling
        ))
    );
    assert_eq!(harness.calls.borrow().catalog_lists, 0);
}

#[test]
fn connection_fault_is_fatal() {
    let mut harness = Harness::new((true, true), &THREE_LABELS, &["1"]);
    harness.connector.fail_compliance = true;
    let err = harness.run().expect_err("connection failure");

    assert!(format!("{err:#}").contains("connect to the compliance center"));
    let calls = harness.calls.borrow();
    assert_eq!(calls.connects.len(), 1);
    assert_eq!(calls.flag_reads, 0);
    assert_eq!(calls.catalog_lists, 0);
}

#[test]
fn read_back_confirms_assignment() {
    let mut harness = Harness::new((true, true), &THREE_LABELS, &["1"]);
    harness.request.verify_assignment = true;
    let Outcome::Applied(assignment) = harness.run().expect("run succeeds") else {
        panic!("expected an applied outcome");
    };
    assert!(assignment.verified);
    assert_eq!(harness.calls.borrow().read_backs, 1);
}

#[test]
fn read_back_mismatch_is_fatal() {
    let mut harness = Harness::new((true, true), &THREE_LABELS, &["1"]);
    harness.request.verify_assignment = true;
    harness.tenant().read_back_override = Some(None);
    let err = harness.run().expect_err("mismatch fails the run");

    assert!(err.to_string().contains("reports no label after assigning label id-Public"));
    assert!(!harness.said("applied to"));
}

#[test]
fn assignment_fault_is_fatal_without_retry_or_rollback() {
    let mut harness = Harness::new((false, false), &THREE_LABELS, &["y", "y", "2"]);
    harness.tenant().fail_assignment = true;
    let err = harness.run().expect_err("assignment fault fails the run");

    let message = format!("{err:#}");
    assert!(
        message.contains("set default sensitivity label on https://Contoso.sharepoint.com/sites/Finance"),
        "{message}"
    );
    assert!(message.contains("Access denied"));
    assert!(!harness.said("applied to"));
    let calls = harness.calls.borrow();
    assert_eq!(calls.assignments.len(), 1, "no retry");
    assert_eq!(
        calls.flag_writes,
        vec![
            (TenantFeature::AipIntegration, true),
            (TenantFeature::PdfSensitivityLabeling, true),
        ]
    );
    assert!(calls.flag_writes.iter().all(|(_, enabled)| *enabled));
    assert_eq!(calls.read_backs, 0);
}

#[test]
fn label_resolution_fault_is_fatal_and_assigns_nothing() {
    let mut harness = Harness::new((true, true), &THREE_LABELS, &["3"]);
    harness.catalog().fail_resolve = true;
    let err = harness.run().expect_err("resolution fault fails the run");

    assert!(format!("{err:#}").contains("resolve id of sensitivity label \"Confidential\""));
    let calls = harness.calls.borrow();
    assert_eq!(calls.resolves, vec!["Confidential".to_string()]);
    assert!(calls.assignments.is_empty());
}

#[test]
fn missing_components_are_installed() {
    let mut harness = Harness::new((true, true), &THREE_LABELS, &["1"]);
    harness.components.installed.clear();
    harness.run().expect("run succeeds");
    assert_eq!(
        harness.components.installs,
        vec!["graph-compliance".to_string(), "spo-tenant-admin".to_string()]
    );
    assert!(harness.said("Installing"));
}

#[test]
fn component_fault_falls_back_to_builtin_profile() {
    let mut harness = Harness::new((true, true), &THREE_LABELS, &["1"]);
    harness.components.fail_import = true;
    let outcome = harness.run().expect("component faults are not fatal");

    assert!(matches!(outcome, Outcome::Applied(_)));
    assert!(harness.said("could not prepare component graph-compliance"));
    assert!(harness.said("could not prepare component spo-tenant-admin"));
    assert_eq!(
        harness.calls.borrow().connects[1],
        "https://Contoso-admin.sharepoint.com"
    );
}

#[test]
fn naming_warnings_respect_name_checking_switch() {
    let mut quiet = Harness::new((true, true), &THREE_LABELS, &["1"]);
    quiet.components.profile_name_override = Some("Graph-Compliance".to_string());
    quiet.run().expect("run succeeds");
    assert!(!quiet.said("naming convention") && !quiet.said("kebab-case"));

    let mut noisy = Harness::new((true, true), &THREE_LABELS, &["1"]);
    noisy.components.profile_name_override = Some("Graph-Compliance".to_string());
    noisy.request.disable_name_checking = false;
    noisy.run().expect("run succeeds");
    assert!(noisy.said("WARNING: component name \"Graph-Compliance\""));
}
