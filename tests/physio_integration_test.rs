use crane_check::config::toml_config::PhysioConfig;
use crane_check::core::physio::{self, SnrStatus};
use crane_check::{load_recording, CheckError};
use tempfile::Builder;

// Level 5 MAT 檔案的最小寫入器，只涵蓋 double 矩陣與字元陣列
const MI_INT8: u32 = 1;
const MI_UINT16: u32 = 4;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_DOUBLE: u32 = 9;
const MI_MATRIX: u32 = 14;
const MX_CHAR: u32 = 4;
const MX_DOUBLE: u32 = 6;

fn header() -> Vec<u8> {
    let mut h = b"MATLAB 5.0 MAT-file, Platform: test".to_vec();
    h.resize(116, b' ');
    h.extend_from_slice(&[0u8; 8]);
    h.extend_from_slice(&0x0100u16.to_le_bytes());
    h.extend_from_slice(b"IM");
    h
}

fn element(data_type: u32, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&data_type.to_le_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    while out.len() % 8 != 0 {
        out.push(0);
    }
    out
}

fn matrix(name: &str, class: u32, dims: &[usize], real: Vec<u8>) -> Vec<u8> {
    let mut flags = class.to_le_bytes().to_vec();
    flags.extend_from_slice(&0u32.to_le_bytes());
    let dims: Vec<u8> = dims.iter().flat_map(|&d| (d as i32).to_le_bytes()).collect();

    let mut body = element(MI_UINT32, &flags);
    body.extend(element(MI_INT32, &dims));
    body.extend(element(MI_INT8, name.as_bytes()));
    body.extend(real);
    element(MI_MATRIX, &body)
}

fn doubles(name: &str, dims: &[usize], values: &[f64]) -> Vec<u8> {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    matrix(name, MX_DOUBLE, dims, element(MI_DOUBLE, &bytes))
}

fn chars(name: &str, rows: &[&str]) -> Vec<u8> {
    let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut bytes = Vec::new();
    for j in 0..width {
        for row in rows {
            let unit = row.as_bytes().get(j).copied().unwrap_or(b' ') as u16;
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
    }
    matrix(name, MX_CHAR, &[rows.len(), width], element(MI_UINT16, &bytes))
}

const N: usize = 5000;

/// 250 Hz: slowly rising EDA, one beat per second on the ECG, a square-wave trigger.
fn session_bytes(labels: &[&str]) -> Vec<u8> {
    let mut values = Vec::with_capacity(N * labels.len());
    for label in labels {
        for i in 0..N {
            let v = if label.contains("EDA") {
                2.0 + (i as f64 / N as f64) * 0.5
            } else if label.contains("ECG") {
                let d = (i as i64 - 125).rem_euclid(250);
                (1.0 - d.min(250 - d) as f64 / 3.0).max(0.0)
            } else if (i / 1000) % 2 == 1 {
                5.0
            } else {
                0.0
            };
            values.push(v);
        }
    }

    let mut bytes = header();
    bytes.extend(doubles("data", &[N, labels.len()], &values));
    bytes.extend(chars("labels", labels));
    bytes.extend(chars("units", &["microsiemens", "mV", "Volts"][..labels.len()]));
    bytes.extend(doubles("isi", &[1, 1], &[4.0]));
    bytes.extend(chars("isi_units", &["ms"]));
    bytes
}

fn write_mat(bytes: &[u8]) -> tempfile::NamedTempFile {
    let file = Builder::new().suffix(".mat").tempfile().unwrap();
    std::fs::write(file.path(), bytes).unwrap();
    file
}

#[test]
fn test_recording_end_to_end() {
    let file = write_mat(&session_bytes(&["EDA100C", "ECG100C", "Trigger"]));
    let recording = load_recording(file.path()).unwrap();

    assert_eq!(recording.sample_count(), N);
    assert_eq!(recording.labels, vec!["EDA100C", "ECG100C", "Trigger"]);
    assert_eq!(recording.unit(0), "microsiemens");

    let report = physio::analyze(&recording, &PhysioConfig::default());
    assert_eq!(report.sampling_frequency, 250.0);
    assert!((report.duration_minutes - N as f64 / 15000.0).abs() < 1e-12);

    let eda = report.eda.as_ref().unwrap();
    assert!(eda.avg_tonic > 2.0 && eda.avg_tonic < 2.5);

    let ecg = report.ecg.as_ref().unwrap();
    assert_eq!(ecg.r_peaks, 20);
    assert!((ecg.avg_hr_bpm.unwrap() - 60.0).abs() < 1.0);
    assert!(ecg.snr_status.is_some());

    assert_eq!(report.trigger.as_ref().unwrap().rising_edges, 2);
}

#[test]
fn test_snr_threshold_from_config() {
    let file = write_mat(&session_bytes(&["EDA100C", "ECG100C", "Trigger"]));
    let recording = load_recording(file.path()).unwrap();

    let config = PhysioConfig {
        snr_high_db: -100.0,
        ..PhysioConfig::default()
    };
    let report = physio::analyze(&recording, &config);
    assert_eq!(report.ecg.unwrap().snr_status, Some(SnrStatus::High));
}

#[test]
fn test_recording_without_ecg() {
    let file = write_mat(&session_bytes(&["EDA100C"]));
    let recording = load_recording(file.path()).unwrap();
    let report = physio::analyze(&recording, &PhysioConfig::default());

    assert!(report.eda.is_some());
    assert!(report.ecg.is_none());
    assert!(!report.passed());
    assert!(report
        .lines()
        .contains(&"Warning: No ECG channel matching 'ECG'".to_string()));
}

#[test]
fn test_invalid_recordings() {
    let err = load_recording("missing/recording.mat").unwrap_err();
    assert_eq!(
        err.user_friendly_message(),
        "Error: File not found: missing/recording.mat"
    );

    let file = write_mat(b"not a mat file");
    let err = load_recording(file.path()).unwrap_err();
    assert!(matches!(err, CheckError::MatFormatError { .. }));

    // 缺少 isi 變數
    let mut bytes = header();
    bytes.extend(doubles("data", &[2, 1], &[1.0, 2.0]));
    bytes.extend(chars("labels", &["EDA"]));
    bytes.extend(chars("units", &["uS"]));
    let file = write_mat(&bytes);
    let err = load_recording(file.path()).unwrap_err();
    assert!(err.to_string().contains("isi"));
}
