//! Simulator to evaluate the error performance of the whole link
//!
//! Random source frames are sent through the pipeline, each modulated signal passes through a
//! lossy [`Relay`], and the surviving signals are received, optionally over a noisy BPSK-AWGN
//! channel into the turbo decoder. Frames are sent in runs until enough frame errors have been
//! seen (or the maximum number of runs is reached).

use std::fs::File;
use std::io::BufWriter;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::pipeline::ReceiveReport;
use crate::transport::Relay;
use crate::{utils, Bit, Error, ModemConfig, Pipeline, PipelineConfig};

/// Parameters for link simulation
#[derive(Clone, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub struct SimParams {
    /// Link configuration
    pub config: PipelineConfig,
    /// Probability that the relay drops a signal
    pub drop_probability: f64,
    /// Orbit height of the relay (km)
    pub orbit_height_km: f64,
    /// Es/N0 (dB) of the channel into the turbo decoder (noiseless if `None`)
    pub es_over_n0_db: Option<f64>,
    /// Desired minimum number of frame errors
    pub num_frame_errors_min: u32,
    /// Number of frames to be transmitted per run
    pub num_frames_per_run: u32,
    /// Minimum number of runs of frames to be simulated
    pub num_runs_min: u32,
    /// Maximum number of runs of frames to be simulated
    pub num_runs_max: u32,
}

/// Results from link simulation
#[derive(Clone, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub struct SimResults {
    /// Simulation parameters
    pub params: SimParams,
    /// Latency of one hop through the relay (ms)
    pub hop_latency_ms: f64,
    /// Number of runs simulated
    pub num_runs: u32,
    /// Number of frames sent
    pub num_frames: u32,
    /// Number of frames lost in the relay
    pub num_frames_missing: u32,
    /// Number of frames rejected by the receiver
    pub num_frames_rejected: u32,
    /// Number of frames not recovered exactly (including missing and rejected frames)
    pub num_frame_errors: u32,
    /// Number of source bits in decoded frames
    pub num_bits_decoded: u64,
    /// Number of bit errors in decoded frames
    pub num_bit_errors: u64,
}

impl SimResults {
    /// Returns initialized simulation results.
    #[must_use]
    fn new(params: &SimParams, hop_latency_ms: f64) -> Self {
        Self {
            params: *params,
            hop_latency_ms,
            num_runs: 0,
            num_frames: 0,
            num_frames_missing: 0,
            num_frames_rejected: 0,
            num_frame_errors: 0,
            num_bits_decoded: 0,
            num_bit_errors: 0,
        }
    }

    /// Returns bit error rate over the decoded frames.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bit_error_rate(&self) -> f64 {
        if self.num_bits_decoded == 0 {
            0.0
        } else {
            self.num_bit_errors as f64 / self.num_bits_decoded as f64
        }
    }

    /// Returns frame error rate over all frames sent.
    #[must_use]
    pub fn frame_error_rate(&self) -> f64 {
        if self.num_frames == 0 {
            0.0
        } else {
            f64::from(self.num_frame_errors) / f64::from(self.num_frames)
        }
    }

    /// Returns `true` if the simulation is complete.
    fn run_complete(&self) -> bool {
        self.num_runs >= self.params.num_runs_min
            && (self.num_frame_errors >= self.params.num_frame_errors_min
                || self.num_runs >= self.params.num_runs_max)
    }

    /// Updates simulation results after a run.
    fn update_after_run(&mut self, frames: &[Vec<Bit>], report: &ReceiveReport) {
        self.num_runs += 1;
        self.num_frames += count(frames.len());
        for (_, error) in &report.diagnostics {
            if matches!(error, Error::MissingFrame(_)) {
                self.num_frames_missing += 1;
            } else {
                self.num_frames_rejected += 1;
            }
        }
        self.num_frame_errors += count(report.diagnostics.len());
        for (&index, frame_hat) in report.indices.iter().zip(&report.frames) {
            let num_errors = utils::error_count(frame_hat, &frames[index]);
            self.num_bits_decoded += frame_hat.len() as u64;
            self.num_bit_errors += num_errors as u64;
            if num_errors > 0 {
                self.num_frame_errors += 1;
            }
        }
    }

    /// Prints progress message.
    fn print_progress_message(&self) {
        if self.run_complete() {
            tracing::info!(
                modem = modem_name(&self.params.config),
                frame_len = self.params.config.turbo.frame_len,
                drop_probability = self.params.drop_probability,
                es_over_n0_db = self.params.es_over_n0_db,
                hop_latency_ms = self.hop_latency_ms,
                num_frames = self.num_frames,
                missing = self.num_frames_missing,
                rejected = self.num_frames_rejected,
                ber = self.bit_error_rate(),
                fer = self.frame_error_rate(),
                "simulation complete"
            );
        } else {
            tracing::debug!(
                num_runs = self.num_runs,
                num_frame_errors = self.num_frame_errors,
                "simulation in progress"
            );
        }
    }
}

/// Runs link simulation and returns the results.
///
/// # Errors
///
/// Returns an error if the simulation parameters are invalid, or if the link cannot be built
/// from the configuration.
pub fn run_link_sim<R: Rng>(params: &SimParams, rng: &mut R) -> Result<SimResults, Error> {
    check_sim_params(params)?;
    let mut pipeline = Pipeline::from_config(&params.config)?;
    if let Some(es_over_n0_db) = params.es_over_n0_db {
        pipeline = pipeline.with_channel_noise(es_over_n0_db);
    }
    let relay = Relay::new(params.drop_probability)?.with_orbit_height(params.orbit_height_km)?;
    let frame_len = params.config.turbo.frame_len;
    let mut results = SimResults::new(params, relay.hop_latency_ms());
    while !results.run_complete() {
        let frames: Vec<Vec<Bit>> = (0 .. params.num_frames_per_run)
            .map(|_| utils::random_bits(frame_len))
            .collect();
        let received: Vec<Option<Vec<f64>>> = pipeline
            .send(&frames)?
            .into_iter()
            .map(|signal| relay.forward(signal, rng))
            .collect();
        let report = pipeline.receive_lossy(received)?;
        results.update_after_run(&frames, &report);
        results.print_progress_message();
    }
    Ok(results)
}

/// Runs link simulations for several parameter sets and saves the results to a JSON file.
///
/// # Errors
///
/// Returns an error if any simulation fails or if the results cannot be saved.
pub fn run_link_sims<R: Rng>(
    all_params: &[SimParams],
    rng: &mut R,
    json_filename: &str,
) -> Result<(), Error> {
    let mut all_results = Vec::with_capacity(all_params.len());
    for params in all_params {
        all_results.push(run_link_sim(params, rng)?);
        save_results(&all_results, json_filename)?;
    }
    Ok(())
}

/// Saves simulation results to a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn save_results(all_results: &[SimResults], json_filename: &str) -> Result<(), Error> {
    let writer = BufWriter::new(File::create(json_filename)?);
    serde_json::to_writer_pretty(writer, all_results)?;
    Ok(())
}

/// Checks validity of simulation parameters.
fn check_sim_params(params: &SimParams) -> Result<(), Error> {
    if params.num_frames_per_run == 0 {
        return Err(Error::InvalidInput(
            "Number of frames per run cannot be zero".to_string(),
        ));
    }
    if params.num_runs_min > params.num_runs_max {
        return Err(Error::InvalidInput(format!(
            "Minimum number of runs ({}) exceeds maximum number of runs ({})",
            params.num_runs_min, params.num_runs_max
        )));
    }
    Ok(())
}

/// Returns name of the modem in a configuration.
fn modem_name(config: &PipelineConfig) -> &'static str {
    match config.modem {
        ModemConfig::Ask(_) => "ASK",
        ModemConfig::Qpsk(_) => "QPSK",
    }
}

/// Returns count as `u32`, saturating.
fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
