// `livescores settings ...`: show, edit and test the stored settings.
//
// Output goes to any `Write` so the commands can be exercised in tests.

use std::io::Write;

use anyhow::Context;
use tracing::info;

use livescores_core::client::StandingsClient;
use livescores_core::settings::{
    field_enabled, field_states, SettingField, SettingValue, Settings, SettingsRepository,
};

/// Print every setting, marking fields switched off by a dependency.
pub fn show(repo: &SettingsRepository, out: &mut impl Write) -> anyhow::Result<()> {
    let settings = repo.load().context("failed to load settings")?;
    let selected = repo
        .selected_category()
        .context("failed to load selected category")?;

    for state in field_states(&settings) {
        let field = state.field;
        let mut line = format!(
            "{:<16} {:<20} {}",
            field.key(),
            display_value(&settings, field),
            field.label()
        );
        if !state.enabled {
            if let Some(dep) = field.depends_on() {
                line.push_str(&format!(" (disabled: requires {dep})"));
            }
        }
        writeln!(out, "{line}")?;
    }
    writeln!(out, "{:<16} {}", "selected", selected.display_name())?;
    Ok(())
}

/// Validate and save one field.
pub fn set(
    repo: &SettingsRepository,
    field: &str,
    value: &str,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let settings = repo.set_from_str(field, value)?;
    let field: SettingField = field.parse()?;
    info!("Setting {} updated from the command line", field);

    writeln!(out, "Saved {}: {}", field, display_value(&settings, field))?;
    if !field_enabled(&settings, field) {
        if let Some(dep) = field.depends_on() {
            writeln!(out, "Note: {field} has no effect until {dep} is true")?;
        }
    }
    Ok(())
}

/// Probe the API with the stored password. Returns whether it succeeded.
pub async fn test(
    repo: &SettingsRepository,
    client: &StandingsClient,
    out: &mut impl Write,
) -> anyhow::Result<bool> {
    let Some(token) = repo.access_token().context("failed to load settings")? else {
        writeln!(out, "\u{2717} Please enter an access password")?;
        return Ok(false);
    };

    match client.test_connection(&token).await {
        Ok(()) => {
            writeln!(out, "\u{2713} Successfully connected to API")?;
            Ok(true)
        }
        Err(e) => {
            writeln!(out, "\u{2717} {}", e.probe_message())?;
            Ok(false)
        }
    }
}

fn display_value(settings: &Settings, field: SettingField) -> String {
    match (field, settings.get(field)) {
        (SettingField::AccessPassword, SettingValue::Text(pw)) => {
            if pw.is_empty() {
                "(not set)".to_string()
            } else {
                "********".to_string()
            }
        }
        (SettingField::DefaultCategory, SettingValue::Text(c)) if c.is_empty() => {
            "(all)".to_string()
        }
        (_, SettingValue::Bool(b)) => b.to_string(),
        (_, SettingValue::Number(n)) => n.to_string(),
        (_, SettingValue::Text(s)) => s,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
