// ============================================================
// Layer 4 — JSON-lines Sample Loader
// ============================================================
// Loads image samples from JSON-lines files. One sample per
// line, pixels flattened in CHW order:
//
//   {"pixels": [0.1, 0.4, ...], "targets": [3.2]}
//   {"pixels": [0.7, 0.0, ...]}                     ← unlabelled
//
// The path may be a single file or a directory; for a
// directory every *.jsonl file is read in name order so runs
// are reproducible.
//
// Blank lines are ignored. Malformed lines are logged and
// skipped so one bad record doesn't sink a whole dataset.

use anyhow::{bail, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::{sample::ImageSample, traits::SampleSource};

pub struct JsonlLoader {
    /// File or directory to read from
    path: PathBuf,
}

impl JsonlLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The .jsonl files this loader will read, in order
    fn files(&self) -> Result<Vec<PathBuf>> {
        if !self.path.exists() {
            bail!("Data path '{}' does not exist", self.path.display());
        }

        if self.path.is_file() {
            return Ok(vec![self.path.clone()]);
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.path)
            .with_context(|| format!("Cannot read directory '{}'", self.path.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl SampleSource for JsonlLoader {
    fn load_all(&self) -> Result<Vec<ImageSample>> {
        let mut samples = Vec::new();

        for file in self.files()? {
            let loaded = load_single_file(&file)?;
            tracing::debug!("Loaded {} samples from '{}'", loaded.len(), file.display());
            samples.extend(loaded);
        }

        tracing::info!(
            "Loaded {} samples from '{}'",
            samples.len(),
            self.path.display()
        );
        Ok(samples)
    }
}

fn load_single_file(path: &Path) -> Result<Vec<ImageSample>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;

    let mut samples = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<ImageSample>(line) {
            Ok(sample) => samples.push(sample),
            Err(e) => {
                tracing::warn!(
                    "Skipping {}:{}: {}",
                    path.display(),
                    line_no + 1,
                    e
                );
            }
        }
    }
    Ok(samples)
}

/// Write samples as JSON lines. Used to export synthetic data
/// and by tests.
pub fn write_jsonl(path: &Path, samples: &[ImageSample]) -> Result<()> {
    let mut out = String::new();
    for sample in samples {
        out.push_str(&serde_json::to_string(sample)?);
        out.push('\n');
    }
    fs::write(path, out).with_context(|| format!("Cannot write '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_single_file_and_skips_bad_lines() {
        let dir  = tempfile::tempdir().unwrap();
        let file = dir.path().join("train.jsonl");
        fs::write(
            &file,
            "{\"pixels\":[1.0,2.0],\"targets\":[0.5]}\n\nnot json\n{\"pixels\":[3.0,4.0]}\n",
        )
        .unwrap();

        let samples = JsonlLoader::new(&file).load_all().unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].targets, vec![0.5]);
        assert!(!samples[1].is_labelled());
    }

    #[test]
    fn test_reads_directory_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_jsonl(
            &dir.path().join("b.jsonl"),
            &[ImageSample::new(vec![2.0], vec![2.0])],
        )
        .unwrap();
        write_jsonl(
            &dir.path().join("a.jsonl"),
            &[ImageSample::new(vec![1.0], vec![1.0])],
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let samples = JsonlLoader::new(dir.path()).load_all().unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].pixels, vec![1.0]);
        assert_eq!(samples[1].pixels, vec![2.0]);
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(JsonlLoader::new(dir.path().join("nope")).load_all().is_err());
    }
}
