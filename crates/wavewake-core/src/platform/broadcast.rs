use super::WakeSignalSink;

/// Delivers doze pulses to the rest of the system
///
/// Every pulse is logged; when a command is configured it is spawned with the
/// reason in `WAVEWAKE_REASON` and never awaited.
pub struct PulseBroadcaster {
    command: Vec<String>,
}

impl PulseBroadcaster {
    #[must_use]
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl WakeSignalSink for PulseBroadcaster {
    fn emit(&mut self, reason: &str) {
        log::info!("Broadcasting {reason}");

        let Some((program, args)) = self.command.split_first() else {
            return;
        };

        match tokio::process::Command::new(program)
            .args(args)
            .env("WAVEWAKE_REASON", reason)
            .spawn()
        {
            Ok(child) => log::debug!("Spawned pulse command {program} (pid {:?})", child.id()),
            Err(e) => log::error!("Failed to spawn pulse command {program}: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_command_spawns_nothing() {
        // No tokio runtime here: spawning a process would panic
        let mut broadcaster = PulseBroadcaster::new(Vec::new());
        broadcaster.emit("doze_pulse");
        broadcaster.emit("doze_pulse");
        assert!(broadcaster.command.is_empty());
    }

    #[tokio::test]
    async fn test_emit_spawns_command() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("pulsed");
        let script = format!("printf %s \"$WAVEWAKE_REASON\" > {}", marker.display());

        let mut broadcaster =
            PulseBroadcaster::new(vec!["sh".to_string(), "-c".to_string(), script]);
        broadcaster.emit("doze_pulse");

        for _ in 0..100 {
            if let Ok(contents) = std::fs::read_to_string(&marker) {
                if contents == "doze_pulse" {
                    return;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        panic!("pulse command did not run");
    }
}
