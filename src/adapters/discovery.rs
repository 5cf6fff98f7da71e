use crate::utils::error::{CheckError, Result};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

pub fn count_lines<P: AsRef<Path>>(path: P) -> Result<usize> {
    let reader = BufReader::new(std::fs::File::open(path)?);
    Ok(reader.split(b'\n').count())
}

/// Among the `.csv` files in `dir` whose name contains `pattern`, return the
/// one with the most lines.
pub fn find_longest_log<P: AsRef<Path>>(dir: P, pattern: &str) -> Result<PathBuf> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(CheckError::FileNotFound {
            path: dir.display().to_string(),
        });
    }

    let mut best: Option<(PathBuf, usize)> = None;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.contains(pattern) && n.to_ascii_lowercase().ends_with(".csv"))
            .unwrap_or(false);
        if !matches || !path.is_file() {
            continue;
        }

        let lines = count_lines(&path)?;
        tracing::debug!("Candidate log {} has {} lines", path.display(), lines);
        if best.as_ref().map_or(true, |(_, most)| lines > *most) {
            best = Some((path, lines));
        }
    }

    best.map(|(path, _)| path).ok_or_else(|| CheckError::FileNotFound {
        path: format!("{}/*{}*.csv", dir.display(), pattern),
    })
}
