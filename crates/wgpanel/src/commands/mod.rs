//! Command dispatch: bridges CLI args -> console calls -> output formatting.

pub mod clients;
pub mod config_cmd;
pub mod interfaces;
pub mod prefs;
pub mod servers;
pub mod service;
pub mod util;

use wgpanel_core::Console;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a panel-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, console: &Console, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Interfaces(args) => interfaces::handle(console, args, global).await,
        Command::Servers(args) => servers::handle(console, args, global).await,
        Command::Clients(args) => clients::handle(console, args, global).await,
        Command::Prefs(args) => prefs::handle(console, args, global),
        Command::Service(args) => service::handle(console, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
