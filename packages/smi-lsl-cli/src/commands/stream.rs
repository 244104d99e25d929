use crate::cli::{SinkKind, StreamArgs};
use crate::exit_codes;
use smi_lsl::console::{
    announce_termination, forward_lines, wait_for_quit, ConsoleFeed, ConsoleInput, QuitReason,
};
use smi_lsl::outlet::{lsl_available, JsonLinesOutletFactory, OutletFactory};
use smi_lsl::sdk::{require_library, EyeTracker, IViewX, SimulatedTracker, SimulationSettings};
use smi_lsl::streams::{DeviceMetadata, OutletSettings};
use smi_lsl::{
    Bridge, BridgeConfig, BridgeError, CalibrationConfig, CalibrationSettings, ConsolePrompt,
    Endpoints, StatsSnapshot,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn build_config(args: &StreamArgs) -> BridgeConfig {
    BridgeConfig {
        endpoints: Endpoints {
            send_ip: args.send_ip.clone(),
            send_port: args.send_port,
            receive_ip: args.receive_ip.clone(),
            receive_port: args.receive_port,
        },
        sdk_log_level: args.log_level,
        sdk_log_file: PathBuf::from(&args.log_file),
        calibration: CalibrationConfig {
            min_accuracy: args.min_accuracy,
            max_rounds: args.max_rounds,
            settings: CalibrationSettings {
                auto_accept: !args.manual,
                ..CalibrationSettings::default()
            },
        },
        skip_calibration: args.skip_calibration,
        outlet: OutletSettings {
            chunk_size: args.chunk_size,
            max_buffered: args.max_buffer,
        },
        metadata: DeviceMetadata {
            model: args.model.clone(),
            ..DeviceMetadata::default()
        },
    }
}

fn resolve_sink(requested: Option<SinkKind>) -> SinkKind {
    requested.unwrap_or(if lsl_available() {
        SinkKind::Lsl
    } else {
        SinkKind::Json
    })
}

#[cfg(feature = "lsl-support")]
fn lsl_factory() -> Result<Box<dyn OutletFactory>, String> {
    Ok(Box::new(smi_lsl::outlet::LslOutletFactory::new()))
}

#[cfg(not(feature = "lsl-support"))]
fn lsl_factory() -> Result<Box<dyn OutletFactory>, String> {
    Err("LSL support not compiled in. Rebuild with --features lsl-support or use --sink json"
        .to_string())
}

fn open_factory(args: &StreamArgs) -> Result<Box<dyn OutletFactory>, String> {
    match resolve_sink(args.sink) {
        SinkKind::Lsl => {
            if args.output.is_some() {
                return Err("--output only applies to the json sink".to_string());
            }
            lsl_factory()
        }
        SinkKind::Json => match &args.output {
            Some(path) => JsonLinesOutletFactory::file(path)
                .map(|factory| Box::new(factory) as Box<dyn OutletFactory>)
                .map_err(|e| format!("Failed to open output file '{}': {}", path, e)),
            None => Ok(Box::new(JsonLinesOutletFactory::stdout())),
        },
    }
}

fn open_tracker(args: &StreamArgs) -> smi_lsl::Result<Box<dyn EyeTracker>> {
    if args.simulate {
        let settings = SimulationSettings {
            sample_rate: args.sim_rate,
            ..SimulationSettings::default()
        };
        settings.validate()?;
        return Ok(Box::new(SimulatedTracker::new(settings)));
    }
    let path = require_library(args.sdk_path.as_deref())?;
    Ok(Box::new(IViewX::load(path)?))
}

/// Close the console input on Ctrl+C so any pending prompt returns.
fn watch_interrupt(feed: ConsoleFeed, interrupted: Arc<AtomicBool>) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                eprintln!();
                log::info!("Interrupted");
                interrupted.store(true, Ordering::Release);
                feed.close();
            }
            Err(e) => log::warn!("Could not listen for Ctrl+C: {}", e),
        }
    });
}

fn forward_stdin(feed: ConsoleFeed) {
    std::thread::spawn(move || forward_lines(io::stdin().lock(), feed));
}

fn fail(error: &BridgeError) -> i32 {
    eprintln!("Error: {}", error);
    exit_codes::for_error(error)
}

fn print_stats(stats: &StatsSnapshot) {
    eprintln!(
        "Forwarded {} samples and {} events ({} failed pushes)",
        stats.samples_forwarded, stats.events_forwarded, stats.failed_pushes
    );
}

fn wait_for_stop(input: &mut ConsoleInput, read_console: bool) {
    if !read_console {
        eprintln!("\nSTREAMING STARTED\n\nCtrl+C to stop streaming eye data.");
        input.wait_closed();
        return;
    }
    match wait_for_quit(input, io::stderr()) {
        Ok(QuitReason::Command) => log::info!("Stop requested from console"),
        Ok(QuitReason::EndOfInput) => log::info!("Console input closed"),
        Err(e) => log::warn!("Console wait failed: {}", e),
    }
}

/// Connect, calibrate and stream until the console or an interrupt stops it.
///
/// Blocking; every path past a successful connect ends in `Bridge::shutdown`.
fn run_session(args: StreamArgs, mut input: ConsoleInput, interrupted: Arc<AtomicBool>) -> i32 {
    let config = build_config(&args);
    if let Err(e) = config.validate() {
        return fail(&e);
    }

    let factory = match open_factory(&args) {
        Ok(f) => f,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let tracker = match open_tracker(&args) {
        Ok(t) => t,
        Err(e) => return fail(&e),
    };

    let mut bridge = match Bridge::connect(tracker, factory.as_ref(), config) {
        Ok(b) => b,
        Err(e) => return fail(&e),
    };

    let system = bridge.system_info();
    eprintln!(
        "Connected: {} Hz, iViewX {}, API {}, device {:?}",
        system.sample_rate, system.iview_version, system.api_version, system.device
    );

    if !bridge.config().skip_calibration && !interrupted.load(Ordering::Acquire) {
        let calibrated = if args.no_stdin {
            bridge.calibrate(&mut ConsolePrompt::new(io::empty(), io::stderr()))
        } else {
            bridge.calibrate(&mut ConsolePrompt::new(&mut input, io::stderr()))
        };
        if let Err(e) = calibrated {
            return fail(&e);
        }
    }

    if !interrupted.load(Ordering::Acquire) {
        if let Err(e) = bridge.start_streaming() {
            return fail(&e);
        }
        wait_for_stop(&mut input, !args.no_stdin);
    }

    if let Err(e) = announce_termination(io::stderr()) {
        log::debug!("Could not print termination notice: {}", e);
    }

    match bridge.shutdown() {
        Ok(stats) => {
            print_stats(&stats);
            exit_codes::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

pub async fn execute(args: StreamArgs) -> i32 {
    let (input, feed) = ConsoleInput::channel();
    let interrupted = Arc::new(AtomicBool::new(false));

    watch_interrupt(feed.clone(), Arc::clone(&interrupted));
    if !args.no_stdin {
        forward_stdin(feed);
    }

    match tokio::task::spawn_blocking(move || run_session(args, input, interrupted)).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: stream session failed: {}", e);
            exit_codes::EXECUTION_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;

    fn stream_args(extra: &[&str]) -> StreamArgs {
        let mut argv = vec!["smi-lsl", "stream"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Command::Stream(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_build_config_from_args() {
        let args = stream_args(&[
            "--send-ip",
            "10.0.0.2",
            "--receive-port",
            "6000",
            "--min-accuracy",
            "0.5",
            "--manual",
            "--model",
            "RED500",
        ]);
        let config = build_config(&args);
        assert_eq!(config.endpoints.send_ip, "10.0.0.2");
        assert_eq!(config.endpoints.receive_port, 6000);
        assert_eq!(config.calibration.min_accuracy, 0.5);
        assert!(!config.calibration.settings.auto_accept);
        assert_eq!(config.metadata.model, "RED500");
        assert_eq!(config.metadata.manufacturer, "SMI");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_json_sink() {
        assert_eq!(resolve_sink(Some(SinkKind::Json)), SinkKind::Json);
        if !lsl_available() {
            assert_eq!(resolve_sink(None), SinkKind::Json);
        }
    }

    #[test]
    fn test_output_rejected_for_lsl_sink() {
        let args = stream_args(&["--sink", "lsl", "--output", "x.jsonl"]);
        assert!(open_factory(&args).is_err());
    }

    #[test]
    fn test_simulated_rate_must_be_positive() {
        let args = stream_args(&["--simulate", "--sim-rate", "0"]);
        match open_tracker(&args) {
            Err(e) => assert_eq!(exit_codes::for_error(&e), exit_codes::INPUT_ERROR),
            Ok(_) => panic!("zero sample rate accepted"),
        }
    }

    #[test]
    fn test_interrupt_before_streaming_shuts_down() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("gaze.jsonl");
        let args = stream_args(&[
            "--simulate",
            "--sink",
            "json",
            "--output",
            path.to_str().unwrap(),
        ]);

        let (input, feed) = ConsoleInput::channel();
        feed.close();
        let interrupted = Arc::new(AtomicBool::new(true));

        assert_eq!(run_session(args, input, interrupted), exit_codes::SUCCESS);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_interrupt_while_streaming_shuts_down() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("gaze.jsonl");
        let args = stream_args(&[
            "--simulate",
            "--sim-rate",
            "200",
            "--sink",
            "json",
            "--skip-calibration",
            "--output",
            path.to_str().unwrap(),
        ]);

        let (input, feed) = ConsoleInput::channel();
        let interrupted = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&interrupted);
        let session = std::thread::spawn(move || run_session(args, input, flag));

        std::thread::sleep(std::time::Duration::from_millis(100));
        interrupted.store(true, Ordering::Release);
        feed.close();

        assert_eq!(session.join().unwrap(), exit_codes::SUCCESS);
        let contents = std::fs::read_to_string(&path).unwrap();
        for line in contents.lines() {
            let record: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(record["stream"].is_string());
        }
    }
}
