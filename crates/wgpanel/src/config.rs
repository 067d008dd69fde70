//! CLI configuration: thin wrapper around `wgpanel_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--url, --insecure, --timeout).

use std::path::PathBuf;
use std::time::Duration;

use wgpanel_core::{ConsoleConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use wgpanel_config::{
    Config, Profile, config_path, load_config_or_default, profile_state_path, save_config,
    state_path,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Everything `main` needs to open a console: the runtime config and the
/// preference file it persists to.
#[derive(Debug)]
pub struct Resolved {
    pub console: ConsoleConfig,
    pub state_file: PathBuf,
}

/// Pick the active profile and apply flag overrides.
///
/// `--url` without a matching profile runs anonymously against that URL
/// with preferences stored under the profile name.
pub fn resolve(global: &GlobalOpts, config: &Config) -> Result<Resolved, CliError> {
    let name = active_profile_name(global, config);
    let profile = match (config.profiles.get(&name), &global.url) {
        (Some(profile), _) => profile.clone(),
        (None, Some(url)) => Profile {
            url: url.clone(),
            ..Profile::default()
        },
        (None, None) => {
            let mut available: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
            available.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
    };

    Ok(Resolved {
        console: resolve_profile(&profile, &name, global)?,
        state_file: profile_state_path(&profile, &name),
    })
}

/// Translate a `Profile` + global flags into a `ConsoleConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
) -> Result<ConsoleConfig, CliError> {
    let mut profile = profile.clone();

    // 1. URL (flag > env > profile)
    if let Some(url) = &global.url {
        profile.url.clone_from(url);
    }

    let mut cfg = wgpanel_config::profile_to_console_config(&profile, profile_name)?;

    // 2. TLS verification
    if global.insecure {
        cfg.tls = TlsVerification::DangerAcceptInvalid;
    }

    // 3. Timeout (profile wins over the flag's default)
    if profile.timeout.is_none() {
        cfg.timeout = Duration::from_secs(global.timeout);
    }

    Ok(cfg)
}
