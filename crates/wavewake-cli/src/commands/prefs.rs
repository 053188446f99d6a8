//! Gesture preference and doze switch commands

use anyhow::{Context, Result};
use tabled::{Table, Tabled};
use wavewake_core::{
    daemon_control::DaemonControl,
    ipc::{IpcClient, IpcRequest},
};
use wavewake_storage::{Database, Preference, PreferenceKey, DOZE_ENABLED_SETTING};

#[derive(Tabled)]
struct PreferenceRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Gesture")]
    gesture: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

impl From<&Preference> for PreferenceRow {
    fn from(pref: &Preference) -> Self {
        Self {
            key: pref.key.to_string(),
            gesture: pref.key.description().to_string(),
            enabled: if pref.enabled { "yes" } else { "no" }.to_string(),
            updated: pref.updated_at.map_or_else(
                || "never".to_string(),
                |at| at.format("%Y-%m-%d %H:%M").to_string(),
            ),
        }
    }
}

fn parse_key(key: &str) -> Result<PreferenceKey> {
    key.parse::<PreferenceKey>()
        .with_context(|| format!("Unknown preference '{key}' (expected hand_wave or pocket)"))
}

pub fn get_preference(key: &str) -> Result<()> {
    let key = parse_key(key)?;
    let db = Database::new(None)?;
    let enabled = db.get_bool(key, false)?;
    println!("{key} = {}", if enabled { "on" } else { "off" });
    Ok(())
}

pub async fn set_preference(control: &DaemonControl, key: &str, enabled: bool) -> Result<()> {
    let key = parse_key(key)?;
    let db = Database::new(None)?;
    db.set_bool(key, enabled)?;
    println!(
        "{} gesture {}",
        key.description(),
        if enabled { "enabled" } else { "disabled" }
    );

    notify_daemon(control, key).await;
    Ok(())
}

pub fn list_preferences() -> Result<()> {
    let db = Database::new(None)?;
    println!("{}", preferences_table(&db)?);

    let doze = db.get_int(DOZE_ENABLED_SETTING, 1)? != 0;
    println!("\nDoze: {}", if doze { "on" } else { "off" });
    Ok(())
}

/// The daemon re-reads the doze switch on every decision, so no notification is sent
pub fn set_doze(enabled: bool) -> Result<()> {
    let db = Database::new(None)?;
    db.set_int(DOZE_ENABLED_SETTING, i64::from(enabled))?;
    println!("Doze {}", if enabled { "enabled" } else { "disabled" });
    Ok(())
}

fn preferences_table(db: &Database) -> Result<String> {
    let rows: Vec<PreferenceRow> = db
        .get_preferences()?
        .iter()
        .map(PreferenceRow::from)
        .collect();
    Ok(Table::new(rows).to_string())
}

async fn notify_daemon(control: &DaemonControl, key: PreferenceKey) {
    if !control.sock_path().exists() {
        return;
    }
    let client = IpcClient::new(control.sock_path());
    if let Err(e) = client
        .send_command(IpcRequest::PreferenceChanged(key))
        .await
    {
        log::warn!("Could not notify daemon of preference change: {e}");
    }
}
