//! Offline classifier run over recorded proximity readings

use anyhow::{Context, Result};
use std::{fs, path::Path};
use tabled::{Table, Tabled};
use wavewake_core::{GestureClassifier, GestureSet, ProximityReading, WakeSignal};

#[derive(Tabled)]
struct PulseRow {
    #[tabled(rename = "At (ms)")]
    at_ms: i64,
    #[tabled(rename = "Gesture")]
    gesture: String,
    #[tabled(rename = "Near for (ms)")]
    near_ms: i64,
}

impl From<&WakeSignal> for PulseRow {
    fn from(signal: &WakeSignal) -> Self {
        Self {
            at_ms: signal.timestamp_ns / 1_000_000,
            gesture: signal.gesture.to_string(),
            near_ms: signal.delta_ns / 1_000_000,
        }
    }
}

/// Feed readings through a fresh classifier and collect the pulses it emits
pub fn replay_readings(readings: &[ProximityReading], gestures: GestureSet) -> Vec<WakeSignal> {
    let mut classifier = GestureClassifier::new(gestures);
    readings
        .iter()
        .filter_map(|reading| classifier.on_reading(reading))
        .collect()
}

fn load_readings(path: &Path) -> Result<Vec<ProximityReading>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a JSON array of readings", path.display()))
}

pub fn replay_command(path: &Path, gestures: GestureSet) -> Result<()> {
    if !gestures.any() {
        println!("No gestures enabled; pass --hand-wave and/or --pocket");
        return Ok(());
    }

    let readings = load_readings(path)?;
    let pulses = replay_readings(&readings, gestures);

    println!("Replayed {} readings", readings.len());
    if pulses.is_empty() {
        println!("No pulses");
        return Ok(());
    }

    let rows: Vec<PulseRow> = pulses.iter().map(PulseRow::from).collect();
    println!("{}", Table::new(rows));
    println!("{} pulse(s)", pulses.len());
    Ok(())
}
