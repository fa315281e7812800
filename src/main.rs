//! This crate simulates the error performance of a turbo-coded, framed link over an ASK or QPSK
//! modem, with an orbiting relay that drops signals at random. Simulation parameters are specified on the
//! command line (optionally starting from a JSON configuration file), and simulation results are
//! saved to a JSON file.
//!
//! Build the executable with `cargo build --release` and then run `./target/release/turbolink -h`
//! for help on the command-line interface. Set `RUST_LOG` (e.g., `RUST_LOG=debug`) to control
//! the verbosity of progress messages.

#![warn(
    clippy::complexity,
    clippy::pedantic,
    clippy::perf,
    clippy::style,
    clippy::suspicious,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_allocation,
    unused_import_braces,
    unused_qualifications
)]

use anyhow::Result;
use clap::parser::ValueSource;
use clap::{crate_name, crate_version, value_parser, Arg, ArgMatches, Command};
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use turbolink::protocol::FRAME_OVERHEAD_BITS;
use turbolink::sim::{self, SimParams};
use turbolink::{AskConfig, ModemConfig, PipelineConfig, QpskConfig};

/// Main function
fn main() -> Result<()> {
    let timer = Instant::now();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let mut rng = rand::rng();
    let matches = command_line_parser().get_matches();
    let json_filename = &json_filename_from_matches(&matches);
    sim::run_link_sims(&all_sim_params(&matches)?, &mut rng, json_filename)?;
    tracing::info!("Elapsed time: {:.3?}", timer.elapsed());
    Ok(())
}

/// Returns command line parser.
fn command_line_parser() -> Command {
    Command::new(crate_name!())
        .version(crate_version!())
        .about("Evaluates the performance of a turbo-coded, framed link over an ASK or QPSK modem")
        .arg(config_filename())
        .arg(frame_len())
        .arg(num_turbo_iter())
        .arg(modulation())
        .arg(first_snr_db())
        .arg(snr_step_db())
        .arg(num_snr())
        .arg(drop_probability())
        .arg(orbit_height_km())
        .arg(num_frame_errors_min())
        .arg(num_frames_per_run())
        .arg(num_runs_min())
        .arg(num_runs_max())
        .arg(json_filename())
}

/// Returns argument for name of JSON file from which link configuration must be read.
fn config_filename() -> Arg {
    Arg::new("config_filename")
        .short('c')
        .help("Name of JSON file with link configuration (command-line options override it)")
}

/// Returns argument for number of bits per source frame.
fn frame_len() -> Arg {
    Arg::new("frame_len")
        .short('i')
        .value_parser(value_parser!(u32).range(1 ..))
        .default_value("1024")
        .help("Number of bits per source frame")
}

/// Returns argument for number of turbo iterations.
fn num_turbo_iter() -> Arg {
    Arg::new("num_turbo_iter")
        .short('t')
        .value_parser(value_parser!(u32))
        .default_value("6")
        .help("Number of turbo iterations")
}

/// Returns argument for modulation name.
fn modulation() -> Arg {
    Arg::new("modulation")
        .short('m')
        .value_parser(["ASK", "QPSK"])
        .default_value("QPSK")
        .help("Modulation")
}

/// Returns argument for first SNR (dB).
fn first_snr_db() -> Arg {
    Arg::new("first_snr_db")
        .short('r')
        .value_parser(value_parser!(f64))
        .allow_negative_numbers(true)
        .help(
            "First SNR (dB): QPSK receiver SNR, or Es/N0 of the channel into the turbo decoder \
            for ASK; noiseless if absent",
        )
}

/// Returns argument for SNR step (dB).
fn snr_step_db() -> Arg {
    Arg::new("snr_step_db")
        .short('p')
        .value_parser(value_parser!(f64))
        .allow_negative_numbers(true)
        .default_value("1.0")
        .help("SNR step (dB)")
}

/// Returns argument for number of SNR values.
fn num_snr() -> Arg {
    Arg::new("num_snr")
        .short('s')
        .value_parser(value_parser!(u32))
        .default_value("1")
        .help("Number of SNR values")
}

/// Returns argument for relay drop probability.
fn drop_probability() -> Arg {
    Arg::new("drop_probability")
        .short('d')
        .value_parser(value_parser!(f64))
        .default_value("0.001")
        .help("Probability that the relay drops a signal")
}

/// Returns argument for relay orbit height (km).
fn orbit_height_km() -> Arg {
    Arg::new("orbit_height_km")
        .short('o')
        .value_parser(value_parser!(f64))
        .default_value("35786")
        .help("Orbit height of the relay (km)")
}

/// Returns argument for desired minimum number of frame errors.
fn num_frame_errors_min() -> Arg {
    Arg::new("num_frame_errors_min")
        .short('e')
        .value_parser(value_parser!(u32))
        .default_value("100")
        .help("Desired minimum number of frame errors")
}

/// Returns argument for number of frames to be transmitted per run.
fn num_frames_per_run() -> Arg {
    Arg::new("num_frames_per_run")
        .short('b')
        .value_parser(value_parser!(u32))
        .default_value("100")
        .help("Number of frames to be transmitted per run")
}

/// Returns argument for minimum number of runs of frames to be simulated.
fn num_runs_min() -> Arg {
    Arg::new("num_runs_min")
        .short('n')
        .value_parser(value_parser!(u32))
        .default_value("1")
        .help("Minimum number of runs of frames to be simulated")
}

/// Returns argument for maximum number of runs of frames to be simulated.
fn num_runs_max() -> Arg {
    Arg::new("num_runs_max")
        .short('x')
        .value_parser(value_parser!(u32))
        .default_value("10")
        .help("Maximum number of runs of frames to be simulated")
}

/// Returns argument for name of JSON file to which results must be saved.
fn json_filename() -> Arg {
    Arg::new("json_filename")
        .short('f')
        .default_value("results.json")
        .help("Name of JSON file to which results must be saved")
}

/// Returns simulation parameters based on command-line arguments.
fn all_sim_params(matches: &ArgMatches) -> Result<Vec<SimParams>> {
    let mut num_runs_min = num_runs_min_from_matches(matches);
    let mut num_runs_max = num_runs_max_from_matches(matches);
    if num_runs_min > num_runs_max {
        if let Some(ValueSource::DefaultValue) = matches.value_source("num_runs_min") {
            num_runs_min = num_runs_max;
        }
        if let Some(ValueSource::DefaultValue) = matches.value_source("num_runs_max") {
            num_runs_max = num_runs_min;
        }
    }
    let config = pipeline_config_from_matches(matches)?;
    let all_params = all_snr_db_from_matches(matches)
        .into_iter()
        .map(|snr_db| {
            let mut config = config;
            let mut es_over_n0_db = None;
            match &mut config.modem {
                ModemConfig::Qpsk(qpsk) => qpsk.snr_db = snr_db.or(qpsk.snr_db),
                ModemConfig::Ask(_) => es_over_n0_db = snr_db,
            }
            SimParams {
                config,
                drop_probability: drop_probability_from_matches(matches),
                orbit_height_km: orbit_height_km_from_matches(matches),
                es_over_n0_db,
                num_frame_errors_min: num_frame_errors_min_from_matches(matches),
                num_frames_per_run: num_frames_per_run_from_matches(matches),
                num_runs_min,
                num_runs_max,
            }
        })
        .collect();
    Ok(all_params)
}

/// Returns link configuration: read from the configuration file if one is given, with
/// command-line options applied on top.
fn pipeline_config_from_matches(matches: &ArgMatches) -> Result<PipelineConfig> {
    let from_file = matches.get_one::<String>("config_filename");
    let mut config = match from_file {
        Some(filename) => PipelineConfig::from_json_file(filename)?,
        None => PipelineConfig::default(),
    };
    // Without a configuration file, the command-line defaults apply too. OK to unwrap below:
    // every argument other than the configuration file and first SNR has a default value.
    let apply = |id: &str| {
        from_file.is_none() || matches.value_source(id) == Some(ValueSource::CommandLine)
    };
    if apply("frame_len") {
        let frame_len = usize::try_from(*matches.get_one::<u32>("frame_len").unwrap())?;
        config.turbo.frame_len = frame_len;
        config.turbo.interleaver_size = frame_len;
    }
    if apply("num_turbo_iter") {
        config.turbo.iterations = *matches.get_one("num_turbo_iter").unwrap();
    }
    if apply("modulation") {
        config.modem = match matches.get_one::<String>("modulation").unwrap().as_str() {
            "ASK" => ModemConfig::Ask(AskConfig::default()),
            "QPSK" => ModemConfig::Qpsk(QpskConfig::default()),
            _ => panic!("Invalid modulation name"),
        };
    }
    // QPSK frames carry whole protocol frames
    if let ModemConfig::Qpsk(qpsk) = &mut config.modem {
        qpsk.frame_len = 3 * config.turbo.frame_len + FRAME_OVERHEAD_BITS;
    }
    Ok(config)
}

/// Returns all SNR (dB) values (a single `None` if no SNR is given).
fn all_snr_db_from_matches(matches: &ArgMatches) -> Vec<Option<f64>> {
    let Some(&first_snr_db) = matches.get_one::<f64>("first_snr_db") else {
        return vec![None];
    };
    let snr_step_db: f64 = *matches.get_one("snr_step_db").unwrap();
    let num_snr: u32 = *matches.get_one("num_snr").unwrap();
    (0 .. num_snr)
        .map(|n| Some(first_snr_db + snr_step_db * f64::from(n)))
        .collect()
}

/// Returns relay drop probability.
fn drop_probability_from_matches(matches: &ArgMatches) -> f64 {
    *matches.get_one("drop_probability").unwrap()
}

/// Returns relay orbit height (km).
fn orbit_height_km_from_matches(matches: &ArgMatches) -> f64 {
    *matches.get_one("orbit_height_km").unwrap()
}

/// Returns desired minimum number of frame errors.
fn num_frame_errors_min_from_matches(matches: &ArgMatches) -> u32 {
    *matches.get_one("num_frame_errors_min").unwrap()
}

/// Returns number of frames to be transmitted per run.
fn num_frames_per_run_from_matches(matches: &ArgMatches) -> u32 {
    *matches.get_one("num_frames_per_run").unwrap()
}

/// Returns minimum number of runs of frames to be simulated.
fn num_runs_min_from_matches(matches: &ArgMatches) -> u32 {
    *matches.get_one("num_runs_min").unwrap()
}

/// Returns maximum number of runs of frames to be simulated.
fn num_runs_max_from_matches(matches: &ArgMatches) -> u32 {
    *matches.get_one("num_runs_max").unwrap()
}

/// Returns name of JSON file to which simulation results must be saved.
fn json_filename_from_matches(matches: &ArgMatches) -> String {
    matches
        .get_one::<String>("json_filename")
        .unwrap()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command_line_for_test() -> Vec<&'static str> {
        vec![
            crate_name!(),
            "-i",
            "40",
            "-t",
            "4",
            "-m",
            "QPSK",
            "-r",
            "-2.0",
            "-p",
            "0.5",
            "-s",
            "4",
            "-d",
            "0.01",
            "-o",
            "550",
            "-e",
            "50",
            "-b",
            "20",
            "-n",
            "2",
            "-x",
            "5",
            "-f",
            "results.json",
        ]
    }

    #[test]
    fn test_command_line_parser() {
        assert!(command_line_parser()
            .try_get_matches_from(command_line_for_test())
            .is_ok());
        assert!(command_line_parser()
            .try_get_matches_from([crate_name!(), "-m", "FSK"])
            .is_err());
        assert!(command_line_parser()
            .try_get_matches_from([crate_name!(), "-i", "0"])
            .is_err());
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_all_sim_params() {
        let matches = command_line_parser().get_matches_from(command_line_for_test());
        let all_params = all_sim_params(&matches).unwrap();
        let all_snr_db = [-2.0, -1.5, -1.0, -0.5];
        assert_eq!(all_params.len(), 4);
        for (idx, params) in all_params.iter().enumerate() {
            assert_eq!(params.config.turbo.frame_len, 40);
            assert_eq!(params.config.turbo.interleaver_size, 40);
            assert_eq!(params.config.turbo.iterations, 4);
            match params.config.modem {
                ModemConfig::Qpsk(qpsk) => {
                    assert_eq!(qpsk.frame_len, 168);
                    assert_eq!(qpsk.snr_db, Some(all_snr_db[idx]));
                }
                ModemConfig::Ask(_) => panic!("expected QPSK"),
            }
            assert_eq!(params.drop_probability, 0.01);
            assert_eq!(params.orbit_height_km, 550.0);
            assert_eq!(params.es_over_n0_db, None);
            assert_eq!(params.num_frame_errors_min, 50);
            assert_eq!(params.num_frames_per_run, 20);
            assert_eq!(params.num_runs_min, 2);
            assert_eq!(params.num_runs_max, 5);
        }
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_all_sim_params_defaults() {
        let matches = command_line_parser().get_matches_from([crate_name!(), "-m", "ASK", "-x", "0"]);
        let all_params = all_sim_params(&matches).unwrap();
        assert_eq!(all_params.len(), 1);
        assert_eq!(all_params[0].config.modem, ModemConfig::Ask(AskConfig::default()));
        assert_eq!(all_params[0].config.turbo.frame_len, 1024);
        assert_eq!(all_params[0].orbit_height_km, 35786.0);
        assert_eq!(all_params[0].es_over_n0_db, None);
        // Default minimum number of runs yields to an explicit maximum
        assert_eq!(all_params[0].num_runs_min, 0);
        assert_eq!(all_params[0].num_runs_max, 0);
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_all_sim_params_ask_channel_noise() {
        let matches = command_line_parser().get_matches_from([
            crate_name!(),
            "-m",
            "ASK",
            "-r",
            "1.0",
            "-p",
            "2.0",
            "-s",
            "3",
        ]);
        let all_params = all_sim_params(&matches).unwrap();
        let all_es_over_n0_db: Vec<Option<f64>> =
            all_params.iter().map(|params| params.es_over_n0_db).collect();
        assert_eq!(all_es_over_n0_db, [Some(1.0), Some(3.0), Some(5.0)]);
        assert!(all_params
            .iter()
            .all(|params| params.config.modem == ModemConfig::Ask(AskConfig::default())));
    }

    #[test]
    fn test_pipeline_config_from_file() {
        let path = std::env::temp_dir().join(format!(
            "turbolink_main_config_test_{}.json",
            std::process::id()
        ));
        let mut file_config = PipelineConfig::default();
        file_config.turbo.frame_len = 64;
        file_config.turbo.interleaver_size = 64;
        file_config.turbo.iterations = 3;
        file_config.to_json_file(&path).unwrap();
        let filename = path.to_str().unwrap();
        // Settings in the file survive unless given on the command line
        let matches =
            command_line_parser().get_matches_from([crate_name!(), "-c", filename, "-t", "8"]);
        let config = pipeline_config_from_matches(&matches).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.turbo.frame_len, 64);
        assert_eq!(config.turbo.iterations, 8);
        assert_eq!(config.modem, file_config.modem);
    }
}
