//! Server command handlers.

use serde::Serialize;
use tabled::Tabled;
use wgpanel_core::{Console, Server};

use crate::cli::{GlobalOpts, ServersArgs, ServersCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

/// A server as listed: the panel's record plus local view state.
#[derive(Serialize)]
struct ServerListing {
    #[serde(flatten)]
    server: Server,
    clients: usize,
    collapsed: bool,
}

#[derive(Tabled)]
struct ServerRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Networks")]
    networks: String,
    #[tabled(rename = "DNS")]
    dns: String,
    #[tabled(rename = "Clients")]
    clients: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn row(listing: &ServerListing, color: bool) -> ServerRow {
    let s = &listing.server;
    ServerRow {
        id: s.id.clone(),
        name: s.name.clone(),
        networks: s.network_display(),
        dns: s.dns.join(", "),
        clients: if listing.collapsed {
            format!("{} (collapsed)", listing.clients)
        } else {
            listing.clients.to_string()
        },
        status: output::enabled_cell(s.enabled, color),
    }
}

fn detail(s: &Server) -> String {
    let mut lines = vec![
        format!("ID:        {}", s.id),
        format!("Name:      {}", s.name),
        format!("Enabled:   {}", s.enabled),
        format!("DNS:       {}", if s.dns.is_empty() { "-".into() } else { s.dns.join(", ") }),
    ];
    for (family, net) in [("IPv4", &s.ipv4), ("IPv6", &s.ipv6)] {
        let Some(net) = net.as_ref().filter(|n| n.enabled) else {
            continue;
        };
        lines.push(format!(
            "{family}:      {}",
            net.network.as_deref().unwrap_or("-")
        ));
        if !net.routed_networks.is_empty() {
            lines.push(format!("  Routed:  {}", net.routed_networks.join(", ")));
        }
        if let Some(snat) = net.snat.as_ref().filter(|s| s.enabled) {
            lines.push(format!(
                "  SNAT:    {}",
                snat.snat_ip_net.as_deref().unwrap_or("-")
            ));
        }
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(console: &Console, args: ServersArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let interface = util::resolve_interface(console, &args.scope).await?;
    let prefs = console.prefs();

    match args.command {
        ServersCommand::List => {
            let tree = console.load_interface_tree(&interface).await?;
            let listings: Vec<ServerListing> = tree
                .servers
                .into_iter()
                .map(|node| ServerListing {
                    collapsed: prefs.is_server_collapsed(&interface, &node.server.id),
                    clients: node.clients.len(),
                    server: node.server,
                })
                .collect();
            let out = output::render_list(
                &global.output,
                &listings,
                |l| row(l, color),
                |l| l.server.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ServersCommand::Get { server } => {
            let server = console.get_server(&interface, &server).await?;
            let out = output::render_single(&global.output, &server, detail, |s| s.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ServersCommand::Create { body } => {
            let body = util::json_body(&body)?;
            let created = console.create_server(&interface, &body).await?;
            output::print_status(&format!("Server {} created", created.name), global.quiet);
            let out = output::render_single(&global.output, &created, detail, |s| s.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ServersCommand::Update { server, body } => {
            let body = util::json_body(&body)?;
            let updated = console.update_server(&interface, &server, &body).await?;
            let out = output::render_single(&global.output, &updated, detail, |s| s.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ServersCommand::Delete { server } => {
            if !util::confirm(
                &format!("Delete server {server} and all its clients?"),
                global.yes,
            )? {
                return Ok(());
            }
            console.delete_server(&interface, &server).await?;
            output::print_status("Server deleted", global.quiet);
            Ok(())
        }

        ServersCommand::Enable { server } => {
            console.set_server_enabled(&interface, &server, true).await?;
            output::print_status("Server enabled", global.quiet);
            Ok(())
        }

        ServersCommand::Disable { server } => {
            console.set_server_enabled(&interface, &server, false).await?;
            output::print_status("Server disabled", global.quiet);
            Ok(())
        }

        ServersCommand::Move { server, to } => {
            console.move_server(&interface, &server, &to).await?;
            output::print_status(&format!("Server moved to interface {to}"), global.quiet);
            Ok(())
        }

        ServersCommand::Collapse { server } => {
            prefs.set_server_collapsed(&interface, &server, true);
            Ok(())
        }

        ServersCommand::Expand { server } => {
            prefs.set_server_collapsed(&interface, &server, false);
            Ok(())
        }
    }
}
