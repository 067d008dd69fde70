//! Preference command handlers.

use std::fmt::Write as _;

use serde::Serialize;
use wgpanel_core::{ClientsPerPage, Console, SortMethod, ThemeMode, UiState};

use crate::cli::{GlobalOpts, PrefsArgs, PrefsCommand, SortMethodArg, ThemeArg};
use crate::error::CliError;
use crate::output;

impl From<SortMethodArg> for SortMethod {
    fn from(arg: SortMethodArg) -> Self {
        match arg {
            SortMethodArg::Name => Self::Name,
            SortMethodArg::LastHandshake => Self::LastHandshake,
            SortMethodArg::TotalTraffic => Self::TotalTraffic,
            SortMethodArg::Enabled => Self::Enabled,
        }
    }
}

impl From<ThemeArg> for ThemeMode {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Auto => Self::Auto,
            ThemeArg::Light => Self::Light,
            ThemeArg::Dark => Self::Dark,
        }
    }
}

/// Everything the store holds for the current panel.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrefsView {
    scope: Option<String>,
    persisted: bool,
    sort_order: Vec<String>,
    traffic_display_mode: String,
    clients_per_page: String,
    theme_mode: String,
    ui_state: UiState,
}

fn view(console: &Console) -> PrefsView {
    let prefs = console.prefs();
    PrefsView {
        scope: prefs.scope(),
        persisted: prefs.is_initialized(),
        sort_order: prefs.sort_order().tokens().to_vec(),
        traffic_display_mode: prefs.traffic_display_mode().to_string(),
        clients_per_page: prefs.clients_per_page().to_string(),
        theme_mode: prefs.theme_mode().to_string(),
        ui_state: prefs.ui_state(),
    }
}

fn detail(v: &PrefsView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Panel:           {}", v.scope.as_deref().unwrap_or("(unscoped)"));
    if !v.persisted {
        let _ = writeln!(out, "                 changes are not persisted");
    }
    let _ = writeln!(out, "Sort order:      {}", v.sort_order.join(", "));
    let _ = writeln!(out, "Traffic mode:    {}", v.traffic_display_mode);
    let _ = writeln!(out, "Page size:       {}", v.clients_per_page);
    let _ = writeln!(out, "Theme:           {}", v.theme_mode);
    let _ = write!(
        out,
        "Interface:       {}",
        v.ui_state.selected_interface_id.as_deref().unwrap_or("-")
    );
    for (interface, servers) in &v.ui_state.collapsed_servers {
        let ids: Vec<&str> = servers.ids().collect();
        let _ = write!(out, "\nCollapsed [{interface}]: {}", ids.join(", "));
    }
    for (interface, pages) in &v.ui_state.server_pages {
        for (server, page) in pages {
            let _ = write!(out, "\nPage [{interface}/{server}]: {page}");
        }
    }
    out
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(console: &Console, args: PrefsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let prefs = console.prefs();

    match args.command {
        PrefsCommand::Show => {
            let v = view(console);
            let out = output::render_single(&global.output, &v, detail, |v| {
                v.scope.clone().unwrap_or_default()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PrefsCommand::Sort { method, desc } => {
            let order = prefs.update_sort_order(method.into(), !desc);
            output::print_status(
                &format!("Sort order: {}", order.tokens().join(", ")),
                global.quiet,
            );
            Ok(())
        }

        PrefsCommand::TrafficMode { mode } => {
            let mode = mode.map_or_else(|| prefs.traffic_display_mode().toggled(), Into::into);
            prefs.set_traffic_display_mode(mode);
            output::print_status(&format!("Traffic mode: {mode}"), global.quiet);
            Ok(())
        }

        PrefsCommand::PageSize { size } => {
            let size: ClientsPerPage = size.parse().map_err(|e: wgpanel_core::prefs::InvalidPageSize| {
                CliError::Validation {
                    field: "page-size".into(),
                    reason: e.to_string(),
                }
            })?;
            prefs.set_clients_per_page(size);
            output::print_status(&format!("Clients per page: {size}"), global.quiet);
            Ok(())
        }

        PrefsCommand::Theme { mode } => {
            let mode: ThemeMode = mode.into();
            prefs.set_theme_mode(mode);
            output::print_status(&format!("Theme: {mode}"), global.quiet);
            Ok(())
        }

        PrefsCommand::ResetUi => {
            if prefs.reset_ui_state() {
                output::print_status("View state reset", global.quiet);
            }
            Ok(())
        }
    }
}
