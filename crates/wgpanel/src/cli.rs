//! Clap derive structures for the `wgpanel` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// wgpanel -- command-line console for WireGuard panel servers
#[derive(Debug, Parser)]
#[command(
    name = "wgpanel",
    version,
    about = "Manage WireGuard panel interfaces, servers and clients from the command line",
    long_about = "A console for administering a WireGuard panel.\n\n\
        Lists and edits interfaces, servers and clients, renders client\n\
        configs and QR codes, and watches live peer traffic. View settings\n\
        (sort order, page size, collapsed servers) persist per panel.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Panel profile to use
    #[arg(long, short = 'p', env = "WGPANEL_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Panel API root, e.g. https://vpn.example.com/api (overrides profile)
    #[arg(long, env = "WGPANEL_URL", global = true)]
    pub url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "WGPANEL_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "WGPANEL_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "WGPANEL_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage WireGuard interfaces
    #[command(alias = "if", alias = "i")]
    Interfaces(InterfacesArgs),

    /// Manage servers under an interface
    #[command(alias = "srv", alias = "s")]
    Servers(ServersArgs),

    /// Manage clients (peers) under a server
    #[command(alias = "cl", alias = "c")]
    Clients(ClientsArgs),

    /// View and change persisted view preferences
    Prefs(PrefsArgs),

    /// Panel service settings and session
    #[command(alias = "svc")]
    Service(ServiceArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

/// JSON request body for create/update commands.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct BodyArgs {
    /// Read the JSON body from a file
    #[arg(long, short = 'F')]
    pub from_file: Option<PathBuf>,

    /// Inline JSON body
    #[arg(long, short = 'd')]
    pub data: Option<String>,
}

/// Interface selector; defaults to the persisted selection.
#[derive(Debug, Args)]
pub struct InterfaceScope {
    /// Interface ID (defaults to the selected interface)
    #[arg(long, short = 'i', global = true)]
    pub interface: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  INTERFACES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct InterfacesArgs {
    #[command(subcommand)]
    pub command: InterfacesCommand,
}

#[derive(Debug, Subcommand)]
pub enum InterfacesCommand {
    /// List interfaces
    #[command(alias = "ls")]
    List,

    /// Get interface details
    Get {
        /// Interface ID
        interface: String,
    },

    /// Create an interface from JSON
    Create {
        #[command(flatten)]
        body: BodyArgs,
    },

    /// Update an interface from JSON
    Update {
        /// Interface ID
        interface: String,

        #[command(flatten)]
        body: BodyArgs,
    },

    /// Delete an interface
    #[command(alias = "rm")]
    Delete {
        /// Interface ID
        interface: String,
    },

    /// Enable an interface
    Enable {
        /// Interface ID
        interface: String,
    },

    /// Disable an interface
    Disable {
        /// Interface ID
        interface: String,
    },

    /// Make an interface the default for server and client commands
    Select {
        /// Interface ID
        interface: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SERVERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ServersArgs {
    #[command(flatten)]
    pub scope: InterfaceScope,

    #[command(subcommand)]
    pub command: ServersCommand,
}

#[derive(Debug, Subcommand)]
pub enum ServersCommand {
    /// List servers of the interface, with client counts
    #[command(alias = "ls")]
    List,

    /// Get server details
    Get {
        /// Server ID
        server: String,
    },

    /// Create a server from JSON
    Create {
        #[command(flatten)]
        body: BodyArgs,
    },

    /// Update a server from JSON
    Update {
        /// Server ID
        server: String,

        #[command(flatten)]
        body: BodyArgs,
    },

    /// Delete a server
    #[command(alias = "rm")]
    Delete {
        /// Server ID
        server: String,
    },

    /// Enable a server
    Enable {
        /// Server ID
        server: String,
    },

    /// Disable a server
    Disable {
        /// Server ID
        server: String,
    },

    /// Move a server (and its clients) to another interface
    Move {
        /// Server ID
        server: String,

        /// Destination interface ID
        #[arg(long)]
        to: String,
    },

    /// Hide a server's clients in listings
    Collapse {
        /// Server ID
        server: String,
    },

    /// Show a server's clients in listings
    Expand {
        /// Server ID
        server: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CLIENTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ClientsArgs {
    #[command(flatten)]
    pub scope: InterfaceScope,

    #[command(subcommand)]
    pub command: ClientsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ClientsCommand {
    /// List a server's clients in the persisted sort order and page
    #[command(alias = "ls")]
    List {
        /// Server ID
        #[arg(long, short = 's')]
        server: String,

        /// Jump to (and remember) this page
        #[arg(long)]
        page: Option<u32>,
    },

    /// Get client details
    Get {
        /// Server ID
        #[arg(long, short = 's')]
        server: String,

        /// Client ID
        client: String,
    },

    /// Create a client from JSON
    Create {
        /// Server ID
        #[arg(long, short = 's')]
        server: String,

        #[command(flatten)]
        body: BodyArgs,
    },

    /// Update a client from JSON
    Update {
        /// Server ID
        #[arg(long, short = 's')]
        server: String,

        /// Client ID
        client: String,

        #[command(flatten)]
        body: BodyArgs,
    },

    /// Delete a client
    #[command(alias = "rm")]
    Delete {
        /// Server ID
        #[arg(long, short = 's')]
        server: String,

        /// Client ID
        client: String,
    },

    /// Enable a client
    Enable {
        /// Server ID
        #[arg(long, short = 's')]
        server: String,

        /// Client ID
        client: String,
    },

    /// Disable a client
    Disable {
        /// Server ID
        #[arg(long, short = 's')]
        server: String,

        /// Client ID
        client: String,
    },

    /// Print the client's WireGuard config file
    Config {
        /// Server ID
        #[arg(long, short = 's')]
        server: String,

        /// Client ID
        client: String,

        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show the client's WireGuard config as a QR code
    Qr {
        /// Server ID
        #[arg(long, short = 's')]
        server: String,

        /// Client ID
        client: String,
    },

    /// Show live counters of one client
    State {
        /// Server ID
        #[arg(long, short = 's')]
        server: String,

        /// Client ID
        client: String,
    },

    /// Stream live traffic for every client of the interface (Ctrl-C to stop)
    Watch {
        /// Display mode (defaults to the persisted one)
        #[arg(long, short = 'm')]
        mode: Option<TrafficModeArg>,
    },

    /// Mark a client as expanded in listings
    Expand {
        /// Server ID
        #[arg(long, short = 's')]
        server: String,

        /// Client ID
        client: String,
    },

    /// Mark a client as collapsed in listings
    Collapse {
        /// Server ID
        #[arg(long, short = 's')]
        server: String,

        /// Client ID
        client: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PREFERENCES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct PrefsArgs {
    #[command(subcommand)]
    pub command: PrefsCommand,
}

#[derive(Debug, Subcommand)]
pub enum PrefsCommand {
    /// Show all persisted preferences
    Show,

    /// Make a field the primary client sort key
    Sort {
        /// Sort field
        method: SortMethodArg,

        /// Sort descending
        #[arg(long)]
        desc: bool,
    },

    /// Set how client traffic is shown
    TrafficMode {
        /// Display mode; toggles when omitted
        mode: Option<TrafficModeArg>,
    },

    /// Set clients per page (a positive number or "all")
    PageSize {
        /// Page size
        size: String,
    },

    /// Set the color theme
    Theme {
        /// Theme
        mode: ThemeArg,
    },

    /// Forget collapsed servers, expanded clients and pages
    ResetUi,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortMethodArg {
    Name,
    LastHandshake,
    TotalTraffic,
    Enabled,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TrafficModeArg {
    /// Cumulative bytes
    Total,
    /// Bits per second
    Rate,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ThemeArg {
    Auto,
    Light,
    Dark,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SERVICE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ServiceArgs {
    #[command(subcommand)]
    pub command: ServiceCommand,
}

#[derive(Debug, Subcommand)]
pub enum ServiceCommand {
    /// Show the panel's service configuration
    Config,

    /// Check credentials by logging in
    Login,

    /// End the panel session
    Logout,

    /// Change the panel password
    Password,

    /// Validate a SNAT roaming offset
    CheckOffset {
        /// Master interface name
        #[arg(long)]
        ifname: String,

        /// NETMAP source network
        #[arg(long)]
        netmapsrc: String,

        /// Offset within the mapped network
        #[arg(long)]
        offset: String,

        /// VRF name
        #[arg(long, default_value = "")]
        vrf: String,

        /// Address family (4 or 6)
        #[arg(long, default_value = "4")]
        af: u8,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG / COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (secrets masked)
    Show,

    /// Print config and preference file locations
    Path,

    /// List configured profiles (* marks the default)
    Profiles,

    /// Make a profile the default
    Use {
        /// Profile name
        name: String,
    },

    /// Store the profile's password in the system keyring
    SetPassword {
        /// Profile name (defaults to the active one)
        name: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
