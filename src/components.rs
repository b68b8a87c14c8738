//! Local client components.
//!
//! A component is a service profile: the endpoint template and OAuth scope the
//! client needs to talk to one remote service. Profiles are cached as JSON
//! under the user cache directory so operators can repoint a run (for
//! example at a sovereign cloud) by editing one file.
//!
//! # Layout
//!
//! ```text
//! <cache dir>/spolabel/components/graph-compliance.json
//! <cache dir>/spolabel/components/spo-tenant-admin.json
//! ```
use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const PROFILE_SCHEMA_VERSION: u32 = 1;

pub const COMPLIANCE_COMPONENT: &str = "graph-compliance";
pub const TENANT_ADMIN_COMPONENT: &str = "spo-tenant-admin";

const TENANT_PLACEHOLDER: &str = "{tenant}";
const BASE_URL_PLACEHOLDER: &str = "{base_url}";

/// Endpoint description for one remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceProfile {
    pub schema_version: u32,
    pub name: String,
    /// Base URL; may contain `{tenant}`.
    pub base_url: String,
    /// OAuth scope; may contain `{base_url}`.
    pub scope: String,
}

impl ServiceProfile {
    /// Built-in profile for a required component.
    pub fn builtin(name: &str, config: &Config) -> Result<Self> {
        let (base_url, scope) = match name {
            COMPLIANCE_COMPONENT => (
                config.graph_base_url.trim_end_matches('/').to_string(),
                format!("{BASE_URL_PLACEHOLDER}/.default"),
            ),
            TENANT_ADMIN_COMPONENT => (
                format!(
                    "https://{TENANT_PLACEHOLDER}-admin.{}",
                    config.sharepoint_domain.trim().trim_matches('.')
                ),
                format!("{BASE_URL_PLACEHOLDER}/.default"),
            ),
            other => return Err(anyhow!("unknown component {other:?}")),
        };
        Ok(Self {
            schema_version: PROFILE_SCHEMA_VERSION,
            name: name.to_string(),
            base_url,
            scope,
        })
    }

    /// Base URL with the tenant substituted.
    pub fn endpoint(&self, tenant_name: &str) -> String {
        self.base_url
            .replace(TENANT_PLACEHOLDER, tenant_name)
            .trim_end_matches('/')
            .to_string()
    }

    /// Base URL for tenant-independent services.
    pub fn base(&self) -> String {
        self.base_url.trim_end_matches('/').to_string()
    }

    /// Scope for a concrete endpoint.
    pub fn scope_for(&self, endpoint: &str) -> String {
        self.scope.replace(BASE_URL_PLACEHOLDER, endpoint)
    }

    fn validate(&self, expected_name: &str) -> Result<()> {
        if self.schema_version != PROFILE_SCHEMA_VERSION {
            return Err(anyhow!(
                "unsupported profile schema_version {}",
                self.schema_version
            ));
        }
        if !self.name.eq_ignore_ascii_case(expected_name) {
            return Err(anyhow!(
                "profile declares name {:?}, expected {expected_name:?}",
                self.name
            ));
        }
        if !self.base_url.starts_with("https://") {
            return Err(anyhow!("base_url must be an https URL"));
        }
        if self.scope.trim().is_empty() {
            return Err(anyhow!("scope must be non-empty"));
        }
        Ok(())
    }
}

/// A profile loaded for use, with any naming-convention warnings.
#[derive(Debug, Clone)]
pub struct ImportedComponent {
    pub profile: ServiceProfile,
    pub naming_warnings: Vec<String>,
}

/// Local component installation.
pub trait ComponentStore {
    fn is_installed(&self, name: &str) -> bool;

    fn install(&mut self, name: &str) -> Result<()>;

    fn import(&mut self, name: &str) -> Result<ImportedComponent>;

    /// In-memory profile used when preparation fails.
    fn builtin(&self, name: &str) -> Result<ServiceProfile>;
}

/// Profiles cached as JSON files in a directory.
pub struct CacheComponentStore {
    root: PathBuf,
    config: Config,
}

impl CacheComponentStore {
    pub fn new(root: PathBuf, config: Config) -> Self {
        Self { root, config }
    }

    /// Store rooted at `<cache dir>/spolabel/components` (temp dir if there is none).
    pub fn in_user_cache(config: Config) -> Self {
        let cache = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
        Self::new(cache.join("spolabel").join("components"), config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn profile_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }
}

impl ComponentStore for CacheComponentStore {
    fn is_installed(&self, name: &str) -> bool {
        self.profile_path(name).is_file()
    }

    fn install(&mut self, name: &str) -> Result<()> {
        let profile = ServiceProfile::builtin(name, &self.config)?;
        fs::create_dir_all(&self.root)
            .with_context(|| format!("create component dir {}", self.root.display()))?;
        let path = self.profile_path(name);
        let text = serde_json::to_string_pretty(&profile).context("serialize profile")?;
        fs::write(&path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
        tracing::info!(component = name, path = %path.display(), "installed component");
        Ok(())
    }

    fn import(&mut self, name: &str) -> Result<ImportedComponent> {
        let path = self.profile_path(name);
        let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
        let profile: ServiceProfile = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse profile {}", path.display()))?;
        profile
            .validate(name)
            .with_context(|| format!("invalid profile {}", path.display()))?;
        let naming_warnings = naming_warnings(&profile.name);
        tracing::debug!(component = name, base_url = %profile.base_url, "imported component");
        Ok(ImportedComponent {
            profile,
            naming_warnings,
        })
    }

    fn builtin(&self, name: &str) -> Result<ServiceProfile> {
        ServiceProfile::builtin(name, &self.config)
    }
}

fn component_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z][a-z0-9]*(-[a-z0-9]+)*$").expect("valid component name regex")
    })
}

/// Warnings for names outside the lowercase kebab-case convention.
pub fn naming_warnings(name: &str) -> Vec<String> {
    if component_name_pattern().is_match(name) {
        Vec::new()
    } else {
        vec![format!(
            "component name {name:?} does not follow the lowercase kebab-case convention"
        )]
    }
}
