//! Monitor assembly: config mapping, source/display selection, run and self-check.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Weak};
use std::time::Duration;

use breath_core::error::Result as CoreResult;
use breath_core::hw_error::map_hw_error;
use breath_core::runner::{self, RunSummary};
use breath_core::state_machine::AlertStateMachine;
use breath_core::Monitor;
use breath_traits::{Display, SampleSource};

/// Environment switch: make the simulator report a foreign device id.
pub const SIM_FAULT_ENV: &str = "BREATH_SIM_FAULT";

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOpts {
    pub duration_ms: Option<u64>,
    pub apnea_after_ms: Option<u64>,
    pub stats: bool,
    pub no_override_input: bool,
    /// Stdout carries JSON only; display frames go to stderr.
    pub json: bool,
}

fn console_display(json: bool) -> Box<dyn Display + Send> {
    if json {
        Box::new(breath_hardware::ConsoleDisplay::new(std::io::stderr()))
    } else {
        Box::new(breath_hardware::ConsoleDisplay::stdout())
    }
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn sim_fault_requested() -> bool {
    std::env::var(SIM_FAULT_ENV).is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn open_source(
    cfg: &breath_config::Config,
    apnea_after_ms: Option<u64>,
) -> eyre::Result<Box<dyn SampleSource + Send>> {
    let mut sim = breath_hardware::SimulatedAccelerometer::new(cfg.sensor.sample_period_ms);
    if let Some(ms) = apnea_after_ms {
        sim = sim.with_apnea_after_ms(ms);
    }
    if sim_fault_requested() {
        sim = sim.with_device_id(0x00);
    }
    tracing::info!(
        period_ms = cfg.sensor.sample_period_ms,
        apnea_after_ms,
        "using simulated accelerometer"
    );
    Ok(Box::new(sim))
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn open_source(
    cfg: &breath_config::Config,
    apnea_after_ms: Option<u64>,
) -> eyre::Result<Box<dyn SampleSource + Send>> {
    if apnea_after_ms.is_some() {
        tracing::warn!("--apnea-after-ms only applies to the simulator; ignored");
    }
    let dev = breath_hardware::hardware::open_accelerometer(
        cfg.hardware.i2c_bus,
        cfg.hardware.i2c_address,
        cfg.hardware.z_offset,
    )?;
    Ok(Box::new(dev))
}

/// Keeps the override input alive for the duration of a run.
enum OverrideInput {
    None,
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    Stdin,
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    Gpio(#[allow(dead_code)] breath_hardware::hardware::InputPin),
}

/// Toggle the override once per line read from `input`.
///
/// The thread holds only a weak reference, so a monitor that has shut down
/// is not kept alive by a reader still blocked on input. It exits at EOF, on
/// a read error, or at the first line after the machine is gone.
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn spawn_override_reader<R>(
    input: R,
    machine: Weak<AlertStateMachine>,
) -> std::io::Result<std::thread::JoinHandle<()>>
where
    R: std::io::BufRead + Send + 'static,
{
    std::thread::Builder::new()
        .name("override-input".into())
        .spawn(move || {
            for line in input.lines() {
                if line.is_err() {
                    break;
                }
                let Some(machine) = machine.upgrade() else {
                    break;
                };
                machine.toggle_override();
            }
            tracing::trace!("override input closed");
        })
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn arm_override(
    _cfg: &breath_config::Config,
    machine: Weak<AlertStateMachine>,
) -> eyre::Result<OverrideInput> {
    // Detached: stdin cannot be interrupted, so the thread ends at EOF, at
    // the next line after shutdown, or with the process.
    match spawn_override_reader(std::io::BufReader::new(std::io::stdin()), machine) {
        Ok(_) => Ok(OverrideInput::Stdin),
        Err(e) => {
            tracing::warn!(error = %e, "failed to start override input; continuing without it");
            Ok(OverrideInput::None)
        }
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn arm_override(
    cfg: &breath_config::Config,
    machine: Weak<AlertStateMachine>,
) -> eyre::Result<OverrideInput> {
    let Some(pin) = cfg.hardware.override_pin else {
        return Ok(OverrideInput::None);
    };
    let input = breath_hardware::hardware::make_override_button(pin, move || {
        if let Some(machine) = machine.upgrade() {
            machine.toggle_override();
        }
    })?;
    Ok(OverrideInput::Gpio(input))
}

pub fn run_monitor(
    cfg: &breath_config::Config,
    opts: RunOpts,
    stop: Arc<AtomicBool>,
) -> CoreResult<RunSummary> {
    let source = open_source(cfg, opts.apnea_after_ms)?;
    let monitor = Monitor::builder()
        .with_source(source)
        .with_display(console_display(opts.json))
        .with_config(cfg)
        .build()?;

    let handle = monitor.start()?;
    let _override = if opts.no_override_input {
        OverrideInput::None
    } else {
        arm_override(cfg, handle.override_target())?
    };

    let limit = opts.duration_ms.map(Duration::from_millis);
    tracing::info!(limit_ms = opts.duration_ms, "monitor running");
    let res = runner::supervise(&handle, &stop, limit);
    handle.shutdown();
    let summary = res?;

    if opts.stats {
        print_stats(&summary);
    }
    Ok(summary)
}

/// One-line JSON result for `run --json`.
pub fn summary_json(s: &RunSummary) -> String {
    serde_json::json!({
        "reason": s.reason.as_str(),
        "elapsed_ms": s.elapsed.as_millis() as u64,
        "state": s.snapshot.state.as_str(),
        "samples": s.snapshot.samples,
        "confirmations": s.snapshot.confirmations,
        "watchdog_expirations": s.snapshot.watchdog_expirations,
        "overrides": s.snapshot.overrides,
        "blinks": s.snapshot.blinks,
    })
    .to_string()
}

/// Print sampling and dispatch counters to stderr.
fn print_stats(s: &RunSummary) {
    let snap = &s.snapshot;
    eprintln!("\n--- Breath Stats ---");
    eprintln!("Samples: {} (breath-like {})", snap.samples, snap.breath_like);
    eprintln!("Skipped reads: {}", snap.skipped);
    eprintln!("Since last good read (ms): {}", snap.since_last_read_ms);
    eprintln!("Confirmations: {}", snap.confirmations);
    eprintln!("Watchdog expirations: {}", snap.watchdog_expirations);
    eprintln!("Overrides: {}", snap.overrides);
    eprintln!(
        "Blinks / steady renders / render errors: {} / {} / {}",
        snap.blinks, snap.steady_renders, snap.render_errors
    );
    eprintln!("--------------------\n");
}

/// Read the identity register once. Device faults surface as `MonitorError`.
pub fn self_check(cfg: &breath_config::Config) -> CoreResult<()> {
    let mut source = open_source(cfg, None)?;
    match source.read() {
        Ok(sample) => {
            tracing::info!(x = sample.x, y = sample.y, z = sample.z, "self-check sample");
            Ok(())
        }
        Err(e) => Err(eyre::Report::new(map_hw_error(e.as_ref()))),
    }
}
