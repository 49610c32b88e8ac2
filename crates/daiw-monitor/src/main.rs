//! DAIW Monitor - terminal front end for the DAIW audio core
//!
//! Lists audio devices, opens an input/output pair, passes input through to
//! the output and draws live stereo level meters.

mod config;
mod meter;

use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use daiw_core::audio::{self, ConfigurationChange, DeviceDescriptor};
use daiw_core::{AudioEngine, AudioResult, Direction};

use meter::{MeterZone, StereoMeter};

/// Width of one text meter bar in characters
const METER_WIDTH: usize = 24;

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio device settings and live level meters", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List audio hosts and every input and output device.
    Devices,
    /// Open devices, pass input through to output and show levels.
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Input device name (empty string disables input).
    #[arg(short, long)]
    input: Option<String>,
    /// Output device name (empty string disables output).
    #[arg(short, long)]
    output: Option<String>,
    /// Sample rate in Hz.
    #[arg(short, long)]
    rate: Option<f64>,
    /// Buffer size in frames.
    #[arg(short, long)]
    buffer: Option<u32>,
    /// Stop after this many seconds (0 = run until killed).
    #[arg(short, long, default_value_t = 0.0)]
    seconds: f64,
    /// Settings file (defaults to the user config directory).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    log::info!("daiw-monitor starting up");

    match cli.command {
        Commands::Devices => {
            list_devices();
            Ok(())
        }
        Commands::Run(args) => run(args),
    }
}

fn list_devices() {
    println!("Hosts: {}", audio::available_host_names().join(", "));
    print_device_group("Input devices", &audio::list_input_devices(), Direction::Input);
    print_device_group("Output devices", &audio::list_output_devices(), Direction::Output);
}

fn print_device_group(title: &str, devices: &[DeviceDescriptor], direction: Direction) {
    let default = audio::default_device_name(direction);
    println!("\n{}:", title);
    if devices.is_empty() {
        println!("  (none)");
    }
    for device in devices {
        let marker = if default.as_deref() == Some(device.name.as_str()) {
            " (default)"
        } else {
            ""
        };
        println!("  {}{}", device, marker);
    }
}

fn run(args: RunArgs) -> Result<()> {
    let config_path = args.config.clone().unwrap_or_else(config::default_config_path);
    let mut settings = config::load_config(&config_path);

    let mut engine = AudioEngine::from_config(&settings);
    if let Some(warning) = engine.last_warning() {
        println!("Warning: {}", warning);
    }
    let changes = engine.subscribe();

    if let Some(name) = &args.input {
        report(engine.set_input_device(name), &engine);
    }
    if let Some(name) = &args.output {
        report(engine.set_output_device(name), &engine);
    }
    if let Some(hz) = args.rate {
        report(engine.set_sample_rate(hz), &engine);
    }
    if let Some(frames) = args.buffer {
        report(engine.set_buffer_size(frames), &engine);
    }
    // Overrides produced Reconfigured events already shown above
    changes.try_iter().for_each(drop);

    print_settings(&engine);
    save_selection(&engine, &mut settings, &config_path);

    engine.start();

    let refresh = Duration::from_secs_f64(1.0 / settings.meter_refresh_hz.max(1) as f64);
    let deadline = (args.seconds > 0.0).then(|| Instant::now() + Duration::from_secs_f64(args.seconds));
    let mut input_meter = StereoMeter::default();
    let mut output_meter = StereoMeter::default();
    let mut stdout = std::io::stdout();

    while deadline.map_or(true, |d| Instant::now() < d) {
        for change in changes.try_iter() {
            println!();
            match change {
                ConfigurationChange::Reconfigured(_) => {
                    save_selection(&engine, &mut settings, &config_path);
                }
                ConfigurationChange::DeviceLost { direction, message } => {
                    println!("Error: {} device lost: {}", direction, message);
                }
                ConfigurationChange::Closed => {}
            }
            print_settings(&engine);
        }

        input_meter.set_levels(engine.input_left(), engine.input_right());
        output_meter.set_levels(engine.output_left(), engine.output_right());
        input_meter.tick();
        output_meter.tick();

        print!(
            "\rIN {} {}  OUT {} {}{}",
            input_meter.left.bar(METER_WIDTH),
            input_meter.right.bar(METER_WIDTH),
            output_meter.left.bar(METER_WIDTH),
            output_meter.right.bar(METER_WIDTH),
            clip_marker(&output_meter),
        );
        stdout.flush()?;

        std::thread::sleep(refresh);
    }

    println!();
    engine.stop();
    log::info!("daiw-monitor shutting down");
    Ok(())
}

fn clip_marker(meter: &StereoMeter) -> &'static str {
    if meter.left.zone() == MeterZone::Hot || meter.right.zone() == MeterZone::Hot {
        "  HOT"
    } else {
        "     "
    }
}

/// Print a failed setter's message followed by what is actually active now
fn report(result: AudioResult<()>, engine: &AudioEngine) {
    if let Err(e) = result {
        println!("Error: {}", e);
        print_settings(engine);
    }
}

fn print_settings(engine: &AudioEngine) {
    let or_none = |name: String| if name.is_empty() { "(none)".to_string() } else { name };
    println!("Input:  {}", or_none(engine.current_input_device_name()));
    println!("Output: {}", or_none(engine.current_output_device_name()));
    if engine.is_open() {
        println!(
            "Format: {} Hz, {} frames (available rates: {:?}, sizes: {:?})",
            engine.current_sample_rate(),
            engine.current_buffer_size(),
            engine.available_sample_rates(),
            engine.available_buffer_sizes()
        );
    }
    println!("{}", status_line(engine.is_open(), engine.latency_ms()));
}

fn status_line(open: bool, latency_ms: f64) -> String {
    if open {
        format!("Latency: {:.1} ms", latency_ms)
    } else {
        "No audio device selected".to_string()
    }
}

fn save_selection(engine: &AudioEngine, settings: &mut daiw_core::EngineConfig, path: &std::path::Path) {
    let Some(current) = engine.current_configuration() else {
        return;
    };
    settings.remember(&current);
    if let Err(e) = config::save_config(settings, path) {
        log::warn!("Could not save audio settings: {:#}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line() {
        assert_eq!(status_line(true, 5.333), "Latency: 5.3 ms");
        assert_eq!(status_line(false, 0.0), "No audio device selected");
    }

    #[test]
    fn test_run_args_parse() {
        let cli = Cli::parse_from([
            "daiw-monitor", "run", "--output", "HDMI", "--rate", "44100", "--buffer", "128",
            "--seconds", "2.5",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.output.as_deref(), Some("HDMI"));
        assert_eq!(args.input, None);
        assert_eq!(args.rate, Some(44100.0));
        assert_eq!(args.buffer, Some(128));
        assert_eq!(args.seconds, 2.5);
    }

    #[test]
    fn test_clip_marker() {
        let mut meter = StereoMeter::default();
        assert_eq!(clip_marker(&meter).trim(), "");
        meter.set_levels(0.0, 0.95);
        assert_eq!(clip_marker(&meter).trim(), "HOT");
    }
}
