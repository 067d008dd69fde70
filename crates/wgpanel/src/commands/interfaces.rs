//! Interface command handlers.

use tabled::Tabled;
use wgpanel_core::{Console, Interface};

use crate::cli::{GlobalOpts, InterfacesArgs, InterfacesCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct InterfaceRow {
    #[tabled(rename = "")]
    selected: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    ifname: String,
    #[tabled(rename = "Endpoint")]
    endpoint: String,
    #[tabled(rename = "MTU")]
    mtu: u32,
    #[tabled(rename = "VRF")]
    vrf: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn row(iface: &Interface, selected: Option<&str>, color: bool) -> InterfaceRow {
    InterfaceRow {
        selected: if selected == Some(iface.id.as_str()) {
            "*".into()
        } else {
            String::new()
        },
        id: iface.id.clone(),
        ifname: iface.ifname.clone(),
        endpoint: format!("{}:{}", iface.endpoint, iface.port),
        mtu: iface.mtu,
        vrf: iface.vrf_name.clone().unwrap_or_default(),
        status: output::enabled_cell(iface.enabled, color),
    }
}

fn detail(iface: &Interface) -> String {
    [
        format!("ID:          {}", iface.id),
        format!("Name:        {}", iface.ifname),
        format!("Endpoint:    {}:{}", iface.endpoint, iface.port),
        format!("MTU:         {}", iface.mtu),
        format!("VRF:         {}", iface.vrf_name.as_deref().unwrap_or("-")),
        format!("FwMark:      {}", iface.fw_mark.as_deref().unwrap_or("-")),
        format!("Public key:  {}", iface.public_key),
        format!("Enabled:     {}", iface.enabled),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    console: &Console,
    args: InterfacesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        InterfacesCommand::List => {
            let interfaces = console.load_interfaces().await?;
            let selected = console.selected_interface_id();
            let out = output::render_list(
                &global.output,
                &interfaces,
                |i| row(i, selected.as_deref(), color),
                |i| i.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        InterfacesCommand::Get { interface } => {
            let iface = console.get_interface(&interface).await?;
            let out = output::render_single(&global.output, &iface, detail, |i| i.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        InterfacesCommand::Create { body } => {
            let body = util::json_body(&body)?;
            let created = console.create_interface(&body).await?;
            output::print_status(&format!("Interface {} created", created.ifname), global.quiet);
            let out = output::render_single(&global.output, &created, detail, |i| i.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        InterfacesCommand::Update { interface, body } => {
            let body = util::json_body(&body)?;
            let updated = console.update_interface(&interface, &body).await?;
            let out = output::render_single(&global.output, &updated, detail, |i| i.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        InterfacesCommand::Delete { interface } => {
            if !util::confirm(
                &format!("Delete interface {interface} with all its servers and clients?"),
                global.yes,
            )? {
                return Ok(());
            }
            // Load first so view state of the deleted interface is pruned
            // against the full remaining list.
            console.load_interfaces().await?;
            console.delete_interface(&interface).await?;
            output::print_status("Interface deleted", global.quiet);
            Ok(())
        }

        InterfacesCommand::Enable { interface } => {
            console.set_interface_enabled(&interface, true).await?;
            output::print_status("Interface enabled", global.quiet);
            Ok(())
        }

        InterfacesCommand::Disable { interface } => {
            console.set_interface_enabled(&interface, false).await?;
            output::print_status("Interface disabled", global.quiet);
            Ok(())
        }

        InterfacesCommand::Select { interface } => {
            console.load_interfaces().await?;
            console.select_interface(&interface)?;
            output::print_status(&format!("Selected interface {interface}"), global.quiet);
            Ok(())
        }
    }
}
