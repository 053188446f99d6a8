/// Daemon lifecycle management commands
use anyhow::{Context, Result};
use std::{env, process::Command, thread::sleep, time};
use sysinfo::{Pid, System};
use wavewake_core::{
    config::{get_data_dir, DaemonConfig},
    daemon_control::DaemonControl,
    ipc::{IpcClient, IpcRequest, IpcResponse},
    Daemon, DisplayState, ServiceStatus,
};
use wavewake_storage::Database;

fn is_running(pid: u32) -> bool {
    let mut sys = System::new();
    sys.refresh_process(Pid::from_u32(pid))
}

pub fn start_daemon(control: &DaemonControl) -> Result<()> {
    // 1. Check if daemon is already running
    match control.get_pid() {
        Ok(Some(pid)) if is_running(pid) => {
            log::info!("Daemon is already running (PID: {pid}).");
            return Ok(());
        }
        Ok(None) => {}
        Ok(Some(_)) | Err(_) => {
            log::warn!("Removing stale PID file.");
            control.remove_pid()?;
        }
    }

    // 2. Clean up old socket if it exists
    if control.sock_path().exists() {
        log::warn!("Removing stale socket file.");
        control.remove_socket()?;
    }

    log::info!("Starting wavewake daemon...");

    // 3. Spawn a new process for the daemon
    let current_exe = env::current_exe()?;
    let current_dir = env::current_dir()?;
    let child = Command::new(current_exe)
        .arg("daemon-internal-start")
        .current_dir(current_dir)
        .spawn()?;

    // 4. In parent process, write PID and exit
    log::info!("Daemon process started with PID: {}", child.id());
    control.write_pid(child.id())?;

    Ok(())
}

pub async fn run_daemon_process(control: &DaemonControl) -> Result<()> {
    // Detached process: logging goes to the data directory
    setup_daemon_logging().context("Failed to set up daemon logging")?;
    log::info!("Daemon process started internally.");

    if let Err(e) = daemon_main_logic(control).await {
        log::error!("Daemon main logic exited with a fatal error: {e:#}");
        return Err(e);
    }

    Ok(())
}

async fn daemon_main_logic(control: &DaemonControl) -> Result<()> {
    let config = DaemonConfig::load_default()?;
    let db = Database::new(None)?;
    let mut daemon = Daemon::new(db, &config)?;
    daemon.run_with_signals(control.sock_path()).await
}

pub async fn stop_daemon(control: &DaemonControl) -> Result<()> {
    let Some(pid) = control.get_pid()? else {
        log::info!("Daemon is not running (no PID file).");
        control.remove_socket()?;
        return Ok(());
    };

    log::info!("Stopping wavewake daemon (PID: {pid})...");
    let client = IpcClient::new(control.sock_path());

    match client.send_command(IpcRequest::Shutdown).await {
        Ok(IpcResponse::Shutdown) => {
            log::info!("Daemon shutdown signal sent. Waiting for process to exit...");
            sleep(time::Duration::from_secs(2));

            let mut sys = System::new();
            if sys.refresh_process(Pid::from_u32(pid)) {
                log::warn!("Daemon did not stop gracefully. Force killing...");
                if let Some(process) = sys.process(Pid::from_u32(pid)) {
                    process.kill();
                }
            } else {
                log::info!("Daemon stopped successfully.");
            }
        }
        Ok(resp) => log::error!("Received unexpected response from daemon: {resp:?}"),
        Err(e) => {
            log::error!("Failed to send shutdown command: {e}. Forcing cleanup.");
            let mut sys = System::new();
            if sys.refresh_process(Pid::from_u32(pid)) {
                if let Some(process) = sys.process(Pid::from_u32(pid)) {
                    process.kill();
                    log::info!("Process killed.");
                }
            }
        }
    }

    control.remove_pid()?;
    control.remove_socket()?;

    Ok(())
}

pub async fn show_status(control: &DaemonControl) -> Result<()> {
    if !control.sock_path().exists() {
        println!("Daemon Status: Not running");
        return Ok(());
    }

    let client = IpcClient::new(control.sock_path());
    match client.send_command(IpcRequest::Status).await {
        Ok(IpcResponse::Status(status)) => print_status(&status),
        Ok(_) => anyhow::bail!("Unexpected response from daemon"),
        Err(e) => {
            log::error!("Failed to get status: {e}");
            println!("Daemon Status: Not running (or not responding)");
        }
    }
    Ok(())
}

/// Tell the daemon about a display edge it cannot observe itself
pub async fn send_display(control: &DaemonControl, state: DisplayState) -> Result<()> {
    let client = IpcClient::new(control.sock_path());
    let response = client
        .send_command(IpcRequest::Display(state))
        .await
        .context("Daemon is not running")?;
    match response {
        IpcResponse::Ack => {
            println!("Display {state} sent to daemon");
            Ok(())
        }
        other => anyhow::bail!("Unexpected response from daemon: {other:?}"),
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

fn print_status(status: &ServiceStatus) {
    println!("Daemon Status: Running");
    println!("  Since: {}", status.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Display: {}", status.display);
    println!(
        "\nSensor: {} ({})",
        status.sensor_name,
        if status.sensor_subscribed {
            "subscribed"
        } else {
            "idle"
        }
    );
    println!("  Wakelock: {}", if status.wakelock_held { "held" } else { "released" });

    println!("\nGestures:");
    println!("  Hand wave: {}", on_off(status.handwave_enabled));
    println!("  Pocket: {}", on_off(status.pocket_enabled));
    println!("  Doze: {}", on_off(status.doze_system_enabled));

    match status.last_pulse_at {
        Some(at) => println!(
            "\nPulses: {} (last at {})",
            status.pulses_emitted,
            at.format("%H:%M:%S")
        ),
        None => println!("\nPulses: {}", status.pulses_emitted),
    }
}

fn setup_daemon_logging() -> Result<()> {
    use std::fs::{create_dir_all, OpenOptions};

    let log_path = get_data_dir()?.join("wavewake.log");

    if let Some(parent) = log_path.parent() {
        create_dir_all(parent)?;
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter_level(log::LevelFilter::Debug)
        .init();

    Ok(())
}
