//! Pipeline configuration.
//!
//! Loads settings from a JSON file with full defaults, so the pipeline
//! runs without any setup. The timing tables live here rather than in
//! code: they describe one institution's bell schedule and are expected
//! to be swapped per deployment.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::error::PipelineError;
use crate::schedule::slots::SLOTS_PER_SESSION;

/// Geometry filters and mask parameters for cell detection.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Grayscale threshold for the binary-inverse highlight mask.
    /// Pixels darker than this become mask foreground.
    pub mask_threshold: u8,
    /// Dilation iterations applied to the mask before contouring.
    pub dilate_iterations: u8,
    /// Minimum bounding-box area as a fraction of total image area.
    pub min_area_fraction: f32,
    /// Maximum bounding-box area as a fraction of total image area.
    pub max_area_fraction: f32,
    /// Cell width bounds in pixels.
    pub min_cell_width: u32,
    pub max_cell_width: u32,
    /// Cell height bounds in pixels.
    pub min_cell_height: u32,
    pub max_cell_height: u32,
    /// Padding added around each surviving box, clamped to image bounds.
    pub cell_padding: u32,
    /// Vertical gap, as a fraction of image height, above which a new
    /// row starts during grouping.
    pub row_gap_fraction: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            mask_threshold: 200,
            dilate_iterations: 2,
            min_area_fraction: 0.0005,
            max_area_fraction: 0.02,
            min_cell_width: 30,
            max_cell_width: 300,
            min_cell_height: 20,
            max_cell_height: 100,
            cell_padding: 2,
            row_gap_fraction: 0.03,
        }
    }
}

/// Parameters for per-cell text resolution.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Padding around the cell box before cropping, in pixels.
    pub crop_padding: u32,
    /// Integer upscale factor applied to each crop before recognition.
    pub upscale_factor: u32,
    /// Tokens at or below this confidence are discarded.
    pub min_token_confidence: f32,
    /// Confidence bonus for text matching the short-code grammar.
    pub short_code_bonus: f32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            crop_padding: 2,
            upscale_factor: 3,
            min_token_confidence: 25.0,
            short_code_bonus: 15.0,
        }
    }
}

/// Per-session timing tables. Each table holds exactly 12 bindable
/// windows in slot order; the lunch boundary is not a window and so
/// never appears here.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Theory-row windows, `HH:MM-HH:MM`.
    pub theory: Vec<String>,
    /// Lab-row windows, `HH:MM-HH:MM`.
    pub lab: Vec<String>,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            theory: [
                "08:00-08:50",
                "08:55-09:45",
                "09:50-10:40",
                "10:45-11:35",
                "11:40-12:30",
                "12:35-13:25",
                "14:00-14:50",
                "14:55-15:45",
                "15:50-16:40",
                "16:45-17:35",
                "17:40-18:30",
                "18:35-19:25",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            lab: [
                "08:00-08:50",
                "08:50-09:40",
                "09:50-10:40",
                "10:40-11:30",
                "11:40-12:30",
                "12:30-13:20",
                "14:00-14:50",
                "14:50-15:40",
                "15:50-16:40",
                "16:40-17:30",
                "17:40-18:30",
                "18:30-19:20",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl TimingConfig {
    /// Checks both tables against the fixed slot template: exactly 12
    /// windows each, every window a well-formed `HH:MM-HH:MM` range.
    pub fn validate(&self) -> Result<(), PipelineError> {
        for (label, table) in [("theory", &self.theory), ("lab", &self.lab)] {
            if table.len() != SLOTS_PER_SESSION {
                return Err(PipelineError::TimingTable(format!(
                    "{} table has {} entries, expected {}",
                    label,
                    table.len(),
                    SLOTS_PER_SESSION
                )));
            }
            for entry in table {
                let Some((start, end)) = crate::schedule::compose::parse_time_range(entry) else {
                    return Err(PipelineError::TimingTable(format!(
                        "{} table entry {:?} is not an HH:MM-HH:MM range",
                        label, entry
                    )));
                };
                if start >= end {
                    return Err(PipelineError::TimingTable(format!(
                        "{} table entry {:?} does not end after it starts",
                        label, entry
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Complete pipeline configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub detection: DetectionConfig,
    pub ocr: OcrConfig,
    pub timings: TimingConfig,
}

impl PipelineConfig {
    /// Load config from a JSON file, or return defaults if the file is
    /// missing or unreadable.
    pub fn load(config_path: &Path) -> Self {
        if config_path.exists() {
            match fs::read_to_string(config_path) {
                Ok(contents) => match serde_json::from_str(&contents) {
                    Ok(config) => return config,
                    Err(e) => {
                        warn!("failed to parse {}: {}. Using defaults.", config_path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("failed to read {}: {}. Using defaults.", config_path.display(), e);
                }
            }
        }
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_timings_validate() {
        TimingConfig::default().validate().unwrap();
    }

    #[test]
    fn test_short_table_rejected() {
        let timings = TimingConfig {
            theory: vec!["08:00-08:50".to_string()],
            ..Default::default()
        };
        assert!(timings.validate().is_err());
    }

    #[test]
    fn test_malformed_window_rejected() {
        let mut timings = TimingConfig::default();
        timings.lab[4] = "noon-ish".to_string();
        assert!(timings.validate().is_err());
    }

    #[test]
    fn test_inverted_window_rejected() {
        let mut timings = TimingConfig::default();
        timings.theory[0] = "09:00-08:00".to_string();
        assert!(timings.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = PipelineConfig::load(Path::new("does_not_exist.json"));
        assert_eq!(config.detection.mask_threshold, 200);
        assert_eq!(config.ocr.upscale_factor, 3);
    }

    #[test]
    fn test_load_partial_file_keeps_other_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", r#"{"ocr": {"min_token_confidence": 40.0}}"#).unwrap();

        let config = PipelineConfig::load(file.path());
        assert_eq!(config.ocr.min_token_confidence, 40.0);
        assert_eq!(config.detection.mask_threshold, 200);
        assert_eq!(config.timings.lab.len(), 12);
    }
}
