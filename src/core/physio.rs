use crate::config::toml_config::PhysioConfig;
use crate::core::signal::{self, mean};
use crate::domain::model::{format_fixed, format_float_repr};
use crate::domain::recording::{Recording, SamplingInterval};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdaSummary {
    pub channel: usize,
    pub unit: String,
    pub avg_tonic: f64,
    pub avg_phasic: f64,
    pub scr_peaks: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnrStatus {
    High,
    Low,
}

impl std::fmt::Display for SnrStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnrStatus::High => write!(f, "high"),
            SnrStatus::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EcgSummary {
    pub channel: usize,
    pub unit: String,
    pub r_peaks: usize,
    /// `None` with fewer than two R peaks.
    pub avg_hr_bpm: Option<f64>,
    /// `None` when no R peak was found.
    pub snr_db: Option<f64>,
    pub snr_status: Option<SnrStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerSummary {
    pub channel: usize,
    pub samples: usize,
    pub rising_edges: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhysioReport {
    pub isi: f64,
    pub isi_units: String,
    pub unit_known: bool,
    pub sampling_frequency: f64,
    pub samples_per_minute: f64,
    pub sample_count: usize,
    pub duration_minutes: f64,
    pub eda_index: Option<usize>,
    pub ecg_index: Option<usize>,
    pub trigger_index: Option<usize>,
    pub eda: Option<EdaSummary>,
    pub ecg: Option<EcgSummary>,
    pub trigger: Option<TriggerSummary>,
    pub warnings: Vec<String>,
    /// Minutes since the first sample, one entry per sample. Left out of JSON
    /// unless kept with [`PhysioReport::keep_time_axis`].
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub time_minutes: Vec<f64>,
}

fn index_text(idx: Option<usize>) -> String {
    idx.map(|i| i.to_string()).unwrap_or_else(|| "None".to_string())
}

impl PhysioReport {
    /// Healthy when both EDA and ECG were analyzed and the ECG is clean.
    pub fn passed(&self) -> bool {
        self.eda.is_some()
            && self
                .ecg
                .as_ref()
                .is_some_and(|ecg| ecg.snr_status == Some(SnrStatus::High))
    }

    /// Drop the per-sample time axis unless `keep` is set.
    pub fn keep_time_axis(mut self, keep: bool) -> Self {
        if !keep {
            self.time_minutes = Vec::new();
        }
        self
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!("ISI: {} {}", format_float_repr(self.isi), self.isi_units)];
        if !self.unit_known {
            lines.push(format!(
                "Warning: Unknown ISI unit '{}', assuming seconds",
                self.isi_units
            ));
        }
        lines.push(format!(
            "Sampling frequency: {} Hz",
            format_fixed(self.sampling_frequency, 2)
        ));
        lines.push(format!(
            "Sample-to-minutes conversion: {} minutes per sample",
            format_fixed(1.0 / self.samples_per_minute, 6)
        ));
        lines.push(format!(
            "  (or: {} samples per minute)",
            format_fixed(self.samples_per_minute, 2)
        ));
        lines.push(format!(
            "Recording length: {} samples ({} minutes)",
            self.sample_count,
            format_fixed(self.duration_minutes, 2)
        ));

        if let Some(last) = self.time_minutes.last() {
            lines.push(format!(
                "Time axis: 0.00 to {} minutes",
                format_fixed(*last, 2)
            ));
        }

        lines.push("Indices:".to_string());
        lines.push(format!(" EDA: {}", index_text(self.eda_index)));
        lines.push(format!(" ECG: {}", index_text(self.ecg_index)));
        lines.push(format!(" Trigger: {}", index_text(self.trigger_index)));

        lines.extend(self.warnings.iter().cloned());

        if let Some(eda) = &self.eda {
            lines.push(String::new());
            lines.push(format!(
                "EDA - Average Tonic: {} {}, Average Phasic: {} {}",
                format_fixed(eda.avg_tonic, 4),
                eda.unit,
                format_fixed(eda.avg_phasic, 4),
                eda.unit
            ));
            lines.push(format!("EDA - Number of SCR Peaks: {}", eda.scr_peaks));
        }

        if let Some(ecg) = &self.ecg {
            let hr = ecg
                .avg_hr_bpm
                .map(|v| format_fixed(v, 2))
                .unwrap_or_else(|| "nan".to_string());
            lines.push(format!("ECG - Average HR: {} bpm ({})", hr, ecg.unit));
            match (ecg.snr_db, ecg.snr_status) {
                (Some(snr), Some(status)) => {
                    lines.push(format!("ECG - SNR: {} dB ({})", format_fixed(snr, 2), status))
                }
                _ => lines.push(
                    "ECG - SNR: Could not calculate (no R-peaks detected)".to_string(),
                ),
            }
        }

        if let Some(trigger) = &self.trigger {
            lines.push(format!(
                "Trigger - {} samples, {} rising edge(s)",
                trigger.samples, trigger.rising_edges
            ));
        }

        lines
    }
}

fn summarize_eda(recording: &Recording, idx: usize, fs: f64) -> EdaSummary {
    let components = signal::decompose_eda(&recording.channel(idx), fs);
    let scr_peaks = signal::detect_scr_peaks(&components.phasic, fs).len();
    tracing::debug!("EDA channel {}: {} SCR peaks", idx, scr_peaks);

    EdaSummary {
        channel: idx,
        unit: recording.unit(idx).to_string(),
        avg_tonic: mean(&components.tonic),
        avg_phasic: mean(&components.phasic),
        scr_peaks,
    }
}

fn summarize_ecg(recording: &Recording, idx: usize, fs: f64, snr_high_db: f64) -> EcgSummary {
    let clean = signal::clean_ecg(&recording.channel(idx), fs);
    let peaks = signal::detect_r_peaks(&clean, fs);
    let avg_hr_bpm = signal::heart_rate(&peaks, clean.len(), fs).map(|hr| mean(&hr));
    let snr_db = signal::snr_db(&clean, &peaks);
    let snr_status = snr_db.map(|snr| {
        if snr > snr_high_db {
            SnrStatus::High
        } else {
            SnrStatus::Low
        }
    });
    tracing::debug!("ECG channel {}: {} R peaks", idx, peaks.len());

    EcgSummary {
        channel: idx,
        unit: recording.unit(idx).to_string(),
        r_peaks: peaks.len(),
        avg_hr_bpm,
        snr_db,
        snr_status,
    }
}

/// Crossings from at or below the mid-range to above it.
fn rising_edges(values: &[f64]) -> usize {
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if hi <= lo {
        return 0;
    }
    let mid = (lo + hi) / 2.0;
    values
        .windows(2)
        .filter(|w| w[0] <= mid && w[1] > mid)
        .count()
}

pub fn analyze(recording: &Recording, config: &PhysioConfig) -> PhysioReport {
    let interval: SamplingInterval = recording.interval();
    let fs = interval.sampling_frequency();
    let mut warnings = Vec::new();

    if !interval.unit_known {
        tracing::warn!("⚠️ Unknown ISI unit '{}', assuming seconds", recording.isi_units);
    }

    let eda_index = recording.find_channel(&config.eda_keyword);
    let ecg_index = recording.find_channel(&config.ecg_keyword);
    let trigger_index = recording.find_channel(&config.trigger_keyword);

    let usable = fs.is_finite() && fs > 0.0 && recording.sample_count() > 0;
    if !usable {
        warnings.push(format!(
            "Warning: Cannot analyze signals (sampling frequency {}, {} samples)",
            format_fixed(fs, 2),
            recording.sample_count()
        ));
    }

    let eda = match eda_index {
        Some(idx) if usable => Some(summarize_eda(recording, idx, fs)),
        Some(_) => None,
        None => {
            tracing::warn!("⚠️ No channel matching '{}'", config.eda_keyword);
            warnings.push(format!(
                "Warning: No EDA channel matching '{}'",
                config.eda_keyword
            ));
            None
        }
    };

    let ecg = match ecg_index {
        Some(idx) if usable => Some(summarize_ecg(recording, idx, fs, config.snr_high_db)),
        Some(_) => None,
        None => {
            tracing::warn!("⚠️ No channel matching '{}'", config.ecg_keyword);
            warnings.push(format!(
                "Warning: No ECG channel matching '{}'",
                config.ecg_keyword
            ));
            None
        }
    };

    let trigger = trigger_index.map(|idx| {
        let values = recording.channel(idx);
        TriggerSummary {
            channel: idx,
            samples: values.len(),
            rising_edges: rising_edges(&values),
        }
    });

    let samples_per_minute = fs * 60.0;
    PhysioReport {
        isi: recording.isi,
        isi_units: recording.isi_units.clone(),
        unit_known: interval.unit_known,
        sampling_frequency: fs,
        samples_per_minute,
        sample_count: recording.sample_count(),
        duration_minutes: recording.sample_count() as f64 / samples_per_minute,
        eda_index,
        ecg_index,
        trigger_index,
        eda,
        ecg,
        trigger,
        warnings,
        time_minutes: recording.time_minutes(),
    }
}
