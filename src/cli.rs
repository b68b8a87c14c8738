//! CLI argument parsing.
//!
//! Long flags are kebab-case; the PowerShell-style names are accepted as
//! aliases so existing runbooks keep working.
use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "spolabel",
    version,
    about = "Enable tenant sensitivity-label support and set a SharePoint site's default label",
    after_help = "Examples:\n  spolabel --user-principal-name admin@contoso.onmicrosoft.com --tenant-name contoso --spo-site-name Finance\n  spolabel --UserPrincipalName admin@contoso.onmicrosoft.com --TenantName contoso --SPOSiteName HR --verify-assignment"
)]
pub struct Args {
    /// Operator account used to sign in to the compliance center
    #[arg(long, alias = "UserPrincipalName", value_name = "UPN")]
    pub user_principal_name: String,

    /// Tenant short name (the `contoso` in contoso.sharepoint.com)
    #[arg(long, alias = "TenantName", value_name = "NAME")]
    pub tenant_name: String,

    /// Site name under /sites/ whose default label is set
    #[arg(long, alias = "SPOSiteName", value_name = "SITE")]
    pub spo_site_name: String,

    /// Transcript log file (parent directory is created if missing)
    #[arg(long, alias = "LogFile", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Suppress component naming-convention warnings
    #[arg(
        long,
        alias = "DisableNameChecking",
        value_name = "BOOL",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub disable_name_checking: bool,

    /// Read the site label back after assigning it
    #[arg(long)]
    pub verify_assignment: bool,

    /// Configuration file (defaults to <config dir>/spolabel/config.json when present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
