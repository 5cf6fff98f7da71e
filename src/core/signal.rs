//! Small offline filters and peak detectors for EDA and ECG channels.
//!
//! Filters are second-order RBJ sections (Q = 1/√2) applied forward and
//! backward so features stay aligned with the raw samples.

use std::f64::consts::PI;

// 低於此振幅的相位波動視為數值雜訊
const MIN_SCR_AMPLITUDE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
    HighPass,
}

#[derive(Debug, Clone)]
pub struct Biquad {
    kind: FilterKind,
    a: [f64; 3],
    b: [f64; 3],
    x: [f64; 2],
    y: [f64; 2],
}

impl Biquad {
    pub fn new(cutoff: f64, fs: f64, kind: FilterKind) -> Self {
        let q = 2.0f64.sqrt() / 2.0;
        let omega = 2.0 * PI * cutoff / fs;
        let (sin, cos) = omega.sin_cos();
        let alpha = sin / (2.0 * q);

        let (b0, b1, b2) = match kind {
            FilterKind::HighPass => ((1.0 + cos) / 2.0, -(1.0 + cos), (1.0 + cos) / 2.0),
            FilterKind::LowPass => ((1.0 - cos) / 2.0, 1.0 - cos, (1.0 - cos) / 2.0),
        };

        Self {
            kind,
            a: [1.0 + alpha, -2.0 * cos, 1.0 - alpha],
            b: [b0, b1, b2],
            x: [0.0; 2],
            y: [0.0; 2],
        }
    }

    /// Seeds the history as if `value` had been the input forever.
    pub fn prime(&mut self, value: f64) {
        let settled = match self.kind {
            FilterKind::LowPass => value,
            FilterKind::HighPass => 0.0,
        };
        self.x = [value; 2];
        self.y = [settled; 2];
    }

    pub fn process(&mut self, input: f64) -> f64 {
        let output = (self.b[0] * input + self.b[1] * self.x[0] + self.b[2] * self.x[1]
            - self.a[1] * self.y[0]
            - self.a[2] * self.y[1])
            / self.a[0];

        self.x[1] = self.x[0];
        self.x[0] = input;
        self.y[1] = self.y[0];
        self.y[0] = output;

        output
    }
}

/// Zero-phase filtering. A cutoff at or above Nyquist leaves the signal as is.
pub fn filtfilt(signal: &[f64], cutoff: f64, fs: f64, kind: FilterKind) -> Vec<f64> {
    if signal.is_empty() || cutoff <= 0.0 || cutoff >= fs / 2.0 {
        return signal.to_vec();
    }

    let mut filter = Biquad::new(cutoff, fs, kind);
    filter.prime(signal[0]);
    let mut forward: Vec<f64> = signal.iter().map(|&v| filter.process(v)).collect();

    let mut filter = Biquad::new(cutoff, fs, kind);
    if let Some(&last) = forward.last() {
        filter.prime(last);
    }
    for v in forward.iter_mut().rev() {
        *v = filter.process(*v);
    }
    forward
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn rms(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    (values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64).sqrt()
}

/// Indices strictly above the left neighbour and not below the right one.
pub fn local_maxima(values: &[f64]) -> Vec<usize> {
    (1..values.len().saturating_sub(1))
        .filter(|&i| values[i] > values[i - 1] && values[i] >= values[i + 1])
        .collect()
}

fn percentile(values: &[f64], p: f64) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (p / 100.0 * (sorted.len() - 1) as f64).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

fn samples_for(seconds: f64, fs: f64) -> usize {
    ((seconds * fs).round() as usize).max(1)
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdaComponents {
    pub clean: Vec<f64>,
    pub tonic: Vec<f64>,
    pub phasic: Vec<f64>,
}

pub fn decompose_eda(signal: &[f64], fs: f64) -> EdaComponents {
    let clean = filtfilt(signal, 3.0, fs, FilterKind::LowPass);
    let tonic = filtfilt(&clean, 0.05, fs, FilterKind::LowPass);
    let phasic = clean.iter().zip(&tonic).map(|(c, t)| c - t).collect();
    EdaComponents {
        clean,
        tonic,
        phasic,
    }
}

/// Skin conductance responses in the phasic component.
pub fn detect_scr_peaks(phasic: &[f64], fs: f64) -> Vec<usize> {
    let maxima = local_maxima(phasic);
    let mut candidates = Vec::with_capacity(maxima.len());
    let mut start = 0;
    for &peak in &maxima {
        let trough = phasic[start..peak]
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        candidates.push((peak, phasic[peak] - trough));
        start = peak;
    }

    let largest = candidates.iter().map(|&(_, rise)| rise).fold(0.0, f64::max);
    if largest < MIN_SCR_AMPLITUDE {
        return Vec::new();
    }

    let min_gap = samples_for(0.1, fs);
    let mut peaks: Vec<usize> = Vec::new();
    for (peak, rise) in candidates {
        if rise < (0.1 * largest).max(MIN_SCR_AMPLITUDE) {
            continue;
        }
        match peaks.last_mut() {
            Some(last) if peak - *last < min_gap => {
                if phasic[peak] > phasic[*last] {
                    *last = peak;
                }
            }
            _ => peaks.push(peak),
        }
    }
    peaks
}

pub fn clean_ecg(signal: &[f64], fs: f64) -> Vec<f64> {
    let detrended = filtfilt(signal, 0.5, fs, FilterKind::HighPass);
    filtfilt(&detrended, 40.0, fs, FilterKind::LowPass)
}

/// R-peak locations in a cleaned ECG trace.
pub fn detect_r_peaks(clean: &[f64], fs: f64) -> Vec<usize> {
    if clean.len() < 3 {
        return Vec::new();
    }

    let energy: Vec<f64> = clean
        .windows(2)
        .map(|w| (w[1] - w[0]).powi(2))
        .chain(std::iter::once(0.0))
        .collect();

    // 置中的移動平均，保持與原始訊號對齊
    let window = samples_for(0.15, fs);
    let half = window / 2;
    let mut prefix = Vec::with_capacity(energy.len() + 1);
    prefix.push(0.0);
    for e in &energy {
        prefix.push(prefix[prefix.len() - 1] + e);
    }
    let integrated: Vec<f64> = (0..energy.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(energy.len());
            (prefix[hi] - prefix[lo]) / (hi - lo) as f64
        })
        .collect();

    let threshold = 0.5 * percentile(&integrated, 98.0);
    if threshold.is_nan() || threshold <= 0.0 {
        return Vec::new();
    }

    let refractory = samples_for(0.3, fs);
    let mut peaks: Vec<usize> = Vec::new();
    let mut i = 0;
    while i < integrated.len() {
        if integrated[i] <= threshold {
            i += 1;
            continue;
        }
        let start = i;
        while i < integrated.len() && integrated[i] > threshold {
            i += 1;
        }
        let peak = (start..i)
            .max_by(|&a, &b| clean[a].total_cmp(&clean[b]))
            .unwrap_or(start);

        match peaks.last() {
            Some(&last) if peak - last < refractory => {}
            _ => peaks.push(peak),
        }
    }
    peaks
}

/// Beats per minute for every sample, held constant between R peaks.
pub fn heart_rate(peaks: &[usize], n: usize, fs: f64) -> Option<Vec<f64>> {
    if peaks.len() < 2 {
        return None;
    }

    let rates: Vec<f64> = peaks
        .windows(2)
        .map(|w| 60.0 * fs / (w[1] - w[0]) as f64)
        .collect();

    let mut segment = 0;
    Some(
        (0..n)
            .map(|i| {
                while segment + 1 < rates.len() && i >= peaks[segment + 1] {
                    segment += 1;
                }
                rates[segment]
            })
            .collect(),
    )
}

/// 20·log10 of mean R amplitude over the RMS of every other sample.
pub fn snr_db(clean: &[f64], peaks: &[usize]) -> Option<f64> {
    if peaks.is_empty() {
        return None;
    }

    let mut is_peak = vec![false; clean.len()];
    let amplitudes: Vec<f64> = peaks
        .iter()
        .filter(|&&p| p < clean.len())
        .map(|&p| {
            is_peak[p] = true;
            clean[p].abs()
        })
        .collect();
    if amplitudes.is_empty() {
        return None;
    }

    let rest: Vec<f64> = clean
        .iter()
        .zip(&is_peak)
        .filter(|(_, peak)| !**peak)
        .map(|(v, _)| *v)
        .collect();
    let noise = rms(&rest);
    if rest.is_empty() || noise == 0.0 {
        return Some(f64::INFINITY);
    }
    Some(20.0 * (mean(&amplitudes) / noise).log10())
}
