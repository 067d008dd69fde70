//! Service command handlers: panel settings, session and password.

use secrecy::{ExposeSecret, SecretString};
use wgpanel_core::{Console, OffsetCheckRequest, ServiceConfig};

use crate::cli::{GlobalOpts, ServiceArgs, ServiceCommand};
use crate::error::CliError;
use crate::output;

fn detail(cfg: &ServiceConfig) -> String {
    [
        format!("Title:          {}", cfg.title.as_deref().unwrap_or("-")),
        format!("Panel ID:       {}", cfg.panel_id.as_deref().unwrap_or("-")),
        format!("User:           {}", cfg.user),
        format!("Listen:         {}:{}", cfg.listen_ip, cfg.listen_port),
        format!("Site prefix:    {}", cfg.site_url_prefix),
        format!("API prefix:     {}", cfg.api_prefix),
        format!("WG config dir:  {}", cfg.wireguard_config_path),
        format!("Interface pfx:  {}", cfg.wg_if_prefix),
    ]
    .join("\n")
}

fn prompt_password(prompt: &str) -> Result<SecretString, CliError> {
    let pw = rpassword::prompt_password(prompt)?;
    if pw.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "must not be empty".into(),
        });
    }
    Ok(SecretString::from(pw))
}

pub async fn handle(console: &Console, args: ServiceArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ServiceCommand::Config => {
            let cfg = console.api()?.service_config().await?;
            let out = output::render_single(&global.output, &cfg, detail, |c| {
                c.panel_id.clone().unwrap_or_default()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // `connect()` already logged in; reaching here means it worked.
        ServiceCommand::Login => match &console.config().credentials {
            Some(credentials) => {
                output::print_status(
                    &format!("Logged in as {}", credentials.username),
                    global.quiet,
                );
                Ok(())
            }
            None => Err(CliError::Validation {
                field: "username".into(),
                reason: "the profile has no username; run: wgpanel config init".into(),
            }),
        },

        ServiceCommand::Logout => {
            console.api()?.logout().await?;
            output::print_status("Logged out", global.quiet);
            Ok(())
        }

        ServiceCommand::Password => {
            let current = prompt_password("Current password: ")?;
            let new = prompt_password("New password: ")?;
            let again = prompt_password("Repeat new password: ")?;
            if new.expose_secret() != again.expose_secret() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "passwords do not match".into(),
                });
            }
            console.api()?.change_password(&current, &new).await?;
            output::print_status(
                "Password changed. Update the stored password with: wgpanel config init",
                global.quiet,
            );
            Ok(())
        }

        ServiceCommand::CheckOffset {
            ifname,
            netmapsrc,
            offset,
            vrf,
            af,
        } => {
            if !matches!(af, 4 | 6) {
                return Err(CliError::Validation {
                    field: "af".into(),
                    reason: format!("expected 4 or 6, got {af}"),
                });
            }
            let request = OffsetCheckRequest {
                ifname,
                netmapsrc,
                offset,
                vrf,
                af,
            };
            let check = console
                .api()?
                .check_snat_roaming_offset(&request)
                .await?;
            let out = output::render_single(
                &global.output,
                &check,
                |c| {
                    format!(
                        "Type:            {}\nSource network:  {}\nMapped network:  {}",
                        c.kind, c.src_network, c.mapped_network
                    )
                },
                |c| c.mapped_network.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
