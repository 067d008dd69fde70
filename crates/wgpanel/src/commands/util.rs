//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;

use wgpanel_core::Console;

use crate::cli::{BodyArgs, InterfaceScope};
use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.to_owned(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Read and parse a JSON file for `--from-file` flags.
pub fn read_json_file(path: &Path) -> Result<serde_json::Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "from-file".into(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// Request body from `--from-file` or `--data`; must be a JSON object.
pub fn json_body(body: &BodyArgs) -> Result<serde_json::Value, CliError> {
    let value = match (&body.from_file, &body.data) {
        (Some(path), _) => read_json_file(path)?,
        (None, Some(inline)) => serde_json::from_str(inline).map_err(|e| CliError::Validation {
            field: "data".into(),
            reason: format!("invalid JSON: {e}"),
        })?,
        (None, None) => {
            return Err(CliError::Validation {
                field: "data".into(),
                reason: "pass --from-file or --data".into(),
            });
        }
    };
    if !value.is_object() {
        return Err(CliError::Validation {
            field: "data".into(),
            reason: "expected a JSON object".into(),
        });
    }
    Ok(value)
}

/// Interface for server and client commands: `--interface`, else the
/// persisted selection (repaired against the panel's current list).
pub async fn resolve_interface(
    console: &Console,
    scope: &InterfaceScope,
) -> Result<String, CliError> {
    if let Some(id) = &scope.interface {
        return Ok(id.clone());
    }
    console.load_interfaces().await?;
    console.selected_interface_id().ok_or(CliError::NoInterface)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn inline_body_must_be_an_object() {
        let body = BodyArgs {
            from_file: None,
            data: Some(r#"{"name": "office"}"#.into()),
        };
        assert_eq!(json_body(&body).unwrap()["name"], "office");

        let body = BodyArgs {
            from_file: None,
            data: Some("[1, 2]".into()),
        };
        assert!(matches!(json_body(&body), Err(CliError::Validation { .. })));
    }

    #[test]
    fn file_body_is_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"ifname": "wg0"}}"#).unwrap();
        let body = BodyArgs {
            from_file: Some(file.path().to_path_buf()),
            data: None,
        };
        assert_eq!(json_body(&body).unwrap()["ifname"], "wg0");
    }

    #[test]
    fn auto_yes_skips_prompt() {
        assert!(confirm("Delete?", true).unwrap());
    }
}
