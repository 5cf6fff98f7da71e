use ndarray::Array2;

/// A multi-channel physiological recording: rows are samples, columns channels.
#[derive(Debug, Clone)]
pub struct Recording {
    pub data: Array2<f64>,
    pub labels: Vec<String>,
    pub units: Vec<String>,
    pub isi: f64,
    pub isi_units: String,
}

/// Sampling interval converted to seconds, plus whether the unit was recognized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingInterval {
    pub seconds: f64,
    pub unit_known: bool,
}

impl SamplingInterval {
    pub fn from_units(isi: f64, units: &str) -> Self {
        let (seconds, unit_known) = match units.trim().to_lowercase().as_str() {
            "ms" => (isi / 1000.0, true),
            "s" => (isi, true),
            "us" | "µs" | "μs" => (isi / 1_000_000.0, true),
            _ => (isi, false),
        };
        Self { seconds, unit_known }
    }

    pub fn sampling_frequency(&self) -> f64 {
        1.0 / self.seconds
    }

    pub fn samples_to_minutes(&self) -> f64 {
        1.0 / (self.sampling_frequency() * 60.0)
    }
}

impl Recording {
    pub fn sample_count(&self) -> usize {
        self.data.nrows()
    }

    pub fn channel_count(&self) -> usize {
        self.data.ncols()
    }

    pub fn interval(&self) -> SamplingInterval {
        SamplingInterval::from_units(self.isi, &self.isi_units)
    }

    /// Index of the first channel whose label contains `keyword` (case-insensitive).
    pub fn find_channel(&self, keyword: &str) -> Option<usize> {
        let keyword = keyword.to_lowercase();
        self.labels
            .iter()
            .position(|label| label.to_lowercase().contains(&keyword))
            .filter(|&idx| idx < self.channel_count())
    }

    pub fn channel(&self, idx: usize) -> Vec<f64> {
        self.data.column(idx).to_vec()
    }

    pub fn unit(&self, idx: usize) -> &str {
        self.units.get(idx).map(String::as_str).unwrap_or("")
    }

    /// Time of each sample in minutes.
    pub fn time_minutes(&self) -> Vec<f64> {
        let step = self.interval().samples_to_minutes();
        (0..self.sample_count()).map(|i| i as f64 * step).collect()
    }
}
