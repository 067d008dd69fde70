//! Client command handlers.

use std::path::Path;

use qrcode::QrCode;
use qrcode::render::unicode;
use serde::Serialize;
use tabled::Tabled;
use tracing::warn;
use wgpanel_core::traffic::{
    FAILURE_NOTICE_THRESHOLD, format_bytes, format_last_handshake, is_client_active,
};
use wgpanel_core::{
    Client, ClientState, Console, InterfaceStateSnapshot, SortOrder, TrafficDisplayMode,
    TrafficSampler, sort_clients,
};

use crate::cli::{ClientsArgs, ClientsCommand, GlobalOpts, TrafficModeArg};
use crate::error::CliError;
use crate::output;

use super::util;

impl From<TrafficModeArg> for TrafficDisplayMode {
    fn from(arg: TrafficModeArg) -> Self {
        match arg {
            TrafficModeArg::Total => Self::Total,
            TrafficModeArg::Rate => Self::Rate,
        }
    }
}

// ── Listing ─────────────────────────────────────────────────────────

/// A client as listed: the panel's record plus its live counters.
#[derive(Serialize)]
struct ClientListing {
    #[serde(flatten)]
    client: Client,
    state: Option<ClientState>,
    active: bool,
    expanded: bool,
    #[serde(skip)]
    handshake: String,
    #[serde(skip)]
    traffic: String,
}

#[derive(Tabled)]
struct ClientRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Handshake")]
    handshake: String,
    #[tabled(rename = "Traffic")]
    traffic: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn addresses(c: &Client) -> String {
    [c.ip, c.ipv6]
        .iter()
        .flatten()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn row(l: &ClientListing, color: bool) -> ClientRow {
    ClientRow {
        id: l.client.id.clone(),
        name: l.client.name.clone(),
        address: addresses(&l.client),
        handshake: output::activity_cell(&l.handshake, l.active, color),
        traffic: l.traffic.clone(),
        status: output::enabled_cell(l.client.enabled, color),
    }
}

fn detail(c: &Client) -> String {
    let mut lines = vec![
        format!("ID:          {}", c.id),
        format!("Name:        {}", c.name),
        format!("Enabled:     {}", c.enabled),
        format!("Address:     {}", addresses(c)),
        format!("Public key:  {}", c.public_key),
    ];
    if !c.dns.is_empty() {
        lines.push(format!("DNS:         {}", c.dns.join(", ")));
    }
    if let Some(keepalive) = c.keepalive {
        lines.push(format!("Keepalive:   {keepalive}s"));
    }
    lines.join("\n")
}

fn state_detail(state: &ClientState) -> String {
    let handshake = state
        .latest_handshake
        .map_or_else(|| "never".into(), |t| t.to_rfc3339());
    [
        format!("Handshake:   {handshake}"),
        format!("Endpoint:    {}", state.endpoint.as_deref().unwrap_or("-")),
        format!(
            "Received:    {}",
            format_bytes(state.transfer_rx.unwrap_or(0))
        ),
        format!(
            "Sent:        {}",
            format_bytes(state.transfer_tx.unwrap_or(0))
        ),
    ]
    .join("\n")
}

/// One poll of the interface for list decoration. A failed poll only
/// drops the live columns.
async fn snapshot(console: &Console, interface: &str) -> Option<InterfaceStateSnapshot> {
    let api = console.api().ok()?;
    match api.interface_clients_state(interface).await {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!(interface, error = %e, "client state unavailable");
            None
        }
    }
}

fn listings(
    console: &Console,
    interface: &str,
    server: &str,
    clients: Vec<Client>,
    snapshot: Option<&InterfaceStateSnapshot>,
) -> Vec<ClientListing> {
    // A single sample has no rate; lists always show totals.
    let mut sampler = TrafficSampler::new(TrafficDisplayMode::Total);
    if let Some(snapshot) = snapshot {
        sampler.record(snapshot.clone());
    }
    let prefs = console.prefs();

    clients
        .into_iter()
        .map(|client| {
            let state = sampler.state(&client.id).cloned();
            let handshake = snapshot.map_or_else(String::new, |s| {
                format_last_handshake(s.timestamp, state.as_ref().and_then(|st| st.latest_handshake))
            });
            ClientListing {
                active: sampler.is_active(&client.id),
                expanded: prefs.is_client_expanded(interface, server, &client.id),
                traffic: if snapshot.is_some() {
                    sampler.traffic_text(&client.id)
                } else {
                    String::new()
                },
                handshake,
                state,
                client,
            }
        })
        .collect()
}

async fn list(
    console: &Console,
    interface: &str,
    server: &str,
    page: Option<u32>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    if let Some(page) = page {
        console.prefs().set_server_page(interface, server, page);
    }

    let clients = console.list_clients(interface, server).await?;
    let snapshot = snapshot(console, interface).await;
    let sorted = console.sorted_clients(&clients, snapshot.as_ref());
    let paged = console.page_of(interface, server, &sorted);

    let rows = listings(console, interface, server, paged.clients, snapshot.as_ref());
    let out = output::render_list(&global.output, &rows, |l| row(l, color), |l| l.client.id.clone());
    output::print_output(&out, global.quiet);

    if matches!(global.output, crate::cli::OutputFormat::Table) {
        for expanded in rows.iter().filter(|l| l.expanded) {
            let mut block = detail(&expanded.client);
            if let Some(state) = &expanded.state {
                block.push('\n');
                block.push_str(&state_detail(state));
            }
            output::print_output(&format!("\n{block}"), global.quiet);
        }
        output::print_status(
            &format!(
                "Page {}/{} ({} clients, sorted by {})",
                paged.page,
                paged.pages,
                paged.total,
                console.prefs().sort_order().primary().method.display_name()
            ),
            global.quiet,
        );
    }
    Ok(())
}

// ── Live view ───────────────────────────────────────────────────────

#[derive(Clone, Serialize, Tabled)]
struct WatchRow {
    #[tabled(rename = "Client")]
    client: String,
    #[tabled(rename = "Handshake")]
    handshake: String,
    #[tabled(rename = "Traffic")]
    traffic: String,
}

async fn watch(
    console: &Console,
    interface: &str,
    mode: Option<TrafficModeArg>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let tree = console.load_interface_tree(interface).await?;
    let clients: Vec<Client> = tree.servers.into_iter().flat_map(|n| n.clients).collect();
    let order = console.prefs().sort_order();

    let mut poller = console.state_poller()?;
    if let Some(mode) = mode {
        poller.set_mode(mode.into());
    }
    let mut rx = poller.subscribe();
    poller.watch(interface);
    output::print_status(
        &format!(
            "Watching {} clients ({} mode, Ctrl-C to stop)",
            clients.len(),
            poller.mode()
        ),
        global.quiet,
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let sampler = rx.borrow_and_update().clone();
                render_tick(&sampler, &clients, &order, global);
            }
            _ = &mut ctrl_c => break,
        }
    }
    poller.stop();
    Ok(())
}

/// Rows for one sample, re-sorted so handshake and traffic keys follow
/// the live counters.
fn watch_rows(
    sampler: &TrafficSampler,
    clients: &[Client],
    order: &SortOrder,
    color: bool,
) -> Vec<WatchRow> {
    let Some(current) = sampler.current() else {
        return Vec::new();
    };
    let now = current.timestamp;
    sort_clients(clients, &current.state, order)
        .iter()
        .map(|c| {
            let last = sampler.state(&c.id).and_then(|s| s.latest_handshake);
            WatchRow {
                client: c.name.clone(),
                handshake: output::activity_cell(
                    &format_last_handshake(now, last),
                    is_client_active(now, last),
                    color,
                ),
                traffic: sampler.traffic_text(&c.id),
            }
        })
        .collect()
}

fn render_tick(
    sampler: &TrafficSampler,
    clients: &[Client],
    order: &SortOrder,
    global: &GlobalOpts,
) {
    if let Some(notice) = sampler.failure_notice(FAILURE_NOTICE_THRESHOLD) {
        eprintln!("{notice}");
    }
    let Some(now) = sampler.now() else {
        return;
    };
    let table = matches!(global.output, crate::cli::OutputFormat::Table);
    let color = table && output::should_color(&global.color);
    let rows = watch_rows(sampler, clients, order, color);
    let out = output::render_list(
        &global.output,
        &rows,
        WatchRow::clone,
        |r| format!("{}\t{}", r.client, r.traffic),
    );
    if table {
        let stamp = now.with_timezone(&chrono::Local).format("%H:%M:%S");
        output::print_output(&format!("Sampled at {stamp}\n{out}"), global.quiet);
    } else {
        output::print_output(&out, global.quiet);
    }
}

// ── Config export ───────────────────────────────────────────────────

fn write_config(text: &str, out: Option<&Path>, quiet: bool) -> Result<(), CliError> {
    match out {
        Some(path) => {
            std::fs::write(path, text)?;
            output::print_status(&format!("Config written to {}", path.display()), quiet);
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn render_qr(text: &str) -> Result<String, CliError> {
    let code = QrCode::new(text.as_bytes()).map_err(|e| CliError::Validation {
        field: "config".into(),
        reason: format!("cannot encode as QR code: {e}"),
    })?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .quiet_zone(true)
        .build())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(console: &Console, args: ClientsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let interface = util::resolve_interface(console, &args.scope).await?;
    let prefs = console.prefs();

    match args.command {
        ClientsCommand::List { server, page } => {
            list(console, &interface, &server, page, global).await
        }

        ClientsCommand::Get { server, client } => {
            let client = console.get_client(&interface, &server, &client).await?;
            let out = output::render_single(&global.output, &client, detail, |c| c.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ClientsCommand::Create { server, body } => {
            let body = util::json_body(&body)?;
            let created = console.create_client(&interface, &server, &body).await?;
            output::print_status(&format!("Client {} created", created.name), global.quiet);
            let out = output::render_single(&global.output, &created, detail, |c| c.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ClientsCommand::Update {
            server,
            client,
            body,
        } => {
            let body = util::json_body(&body)?;
            let updated = console
                .update_client(&interface, &server, &client, &body)
                .await?;
            let out = output::render_single(&global.output, &updated, detail, |c| c.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ClientsCommand::Delete { server, client } => {
            if !util::confirm(&format!("Delete client {client}?"), global.yes)? {
                return Ok(());
            }
            console.delete_client(&interface, &server, &client).await?;
            output::print_status("Client deleted", global.quiet);
            Ok(())
        }

        ClientsCommand::Enable { server, client } => {
            console
                .set_client_enabled(&interface, &server, &client, true)
                .await?;
            output::print_status("Client enabled", global.quiet);
            Ok(())
        }

        ClientsCommand::Disable { server, client } => {
            console
                .set_client_enabled(&interface, &server, &client, false)
                .await?;
            output::print_status("Client disabled", global.quiet);
            Ok(())
        }

        ClientsCommand::Config {
            server,
            client,
            out,
        } => {
            let text = console
                .api()?
                .client_config(&interface, &server, &client)
                .await?;
            write_config(&text, out.as_deref(), global.quiet)
        }

        ClientsCommand::Qr { server, client } => {
            let text = console
                .api()?
                .client_config(&interface, &server, &client)
                .await?;
            output::print_output(&render_qr(&text)?, global.quiet);
            Ok(())
        }

        ClientsCommand::State { server, client } => {
            let state = console
                .api()?
                .client_state(&interface, &server, &client)
                .await?;
            let out = output::render_single(&global.output, &state, state_detail, |s| {
                s.total_traffic().to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ClientsCommand::Watch { mode } => watch(console, &interface, mode, global).await,

        ClientsCommand::Expand { server, client } => {
            prefs.set_client_expanded(&interface, &server, &client, true);
            Ok(())
        }

        ClientsCommand::Collapse { server, client } => {
            prefs.set_client_expanded(&interface, &server, &client, false);
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn qr_renders_config_text() {
        let qr = render_qr("[Interface]\nPrivateKey = abc\n").unwrap();
        assert!(qr.lines().count() > 10);
    }

    #[test]
    fn watch_rows_follow_live_handshakes() {
        let clients: Vec<Client> = ["alpha", "bravo"]
            .iter()
            .map(|name| {
                serde_json::from_value(serde_json::json!({"id": name, "name": name}))
                    .unwrap()
            })
            .collect();
        let mut sampler = TrafficSampler::new(TrafficDisplayMode::Total);
        sampler.record(
            serde_json::from_value(serde_json::json!({
                "state": {
                    "alpha": {"latestHandshake": "2024-05-01T11:00:00Z"},
                    "bravo": {"latestHandshake": "2024-05-01T11:59:50Z"}
                },
                "timestamp": "2024-05-01T12:00:00Z"
            }))
            .unwrap(),
        );
        let order = SortOrder::default().with_front(wgpanel_core::SortMethod::LastHandshake, false);

        let rows = watch_rows(&sampler, &clients, &order, false);
        let names: Vec<&str> = rows.iter().map(|r| r.client.as_str()).collect();
        assert_eq!(names, ["bravo", "alpha"]);

        let rows = watch_rows(&sampler, &clients, &SortOrder::default(), false);
        assert_eq!(rows[0].client, "alpha");
    }

    #[test]
    fn watch_rows_empty_without_sample() {
        let clients: Vec<Client> =
            vec![serde_json::from_value(serde_json::json!({"id": "c1", "name": "c1"})).unwrap()];
        let sampler = TrafficSampler::new(TrafficDisplayMode::Total);
        assert!(watch_rows(&sampler, &clients, &SortOrder::default(), false).is_empty());
    }

    #[test]
    fn addresses_join_both_families() {
        let client: Client = serde_json::from_value(serde_json::json!({
            "id": "c1",
            "name": "laptop",
            "ip": "10.0.0.2",
            "ipv6": "fd00::2"
        }))
        .unwrap();
        assert_eq!(addresses(&client), "10.0.0.2, fd00::2");
    }
}
