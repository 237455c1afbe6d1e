//! OCR engine boundary.
//!
//! The pipeline only needs `recognize(bitmap, profile) -> tokens with
//! confidences`; any engine implementing [`OcrEngine`] is
//! substitutable. The default implementation shells out to the
//! Tesseract CLI and parses its TSV output for word-level confidences.

use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

use crate::error::PipelineError;

/// A single recognized token with its reported confidence (0-100).
#[derive(Debug, Clone)]
pub struct OcrToken {
    pub text: String,
    pub confidence: f32,
}

/// Recognition profile: a layout assumption plus an optional character
/// set restriction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OcrProfile {
    /// Single text line restricted to the period-code alphabet.
    SingleLineCodes,
    /// Uniform block of text.
    Block,
    /// Fully automatic page segmentation.
    Auto,
}

impl OcrProfile {
    /// All profiles the resolver tries, in order.
    pub const ALL: [OcrProfile; 3] = [Self::SingleLineCodes, Self::Block, Self::Auto];

    fn psm(self) -> &'static str {
        match self {
            Self::SingleLineCodes => "7",
            Self::Block => "6",
            Self::Auto => "3",
        }
    }

    fn char_whitelist(self) -> Option<&'static str> {
        match self {
            Self::SingleLineCodes => Some("ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-"),
            Self::Block | Self::Auto => None,
        }
    }
}

/// Text-recognition capability required by the cell resolver.
pub trait OcrEngine: Sync {
    /// Recognizes text in the bitmap, returning tokens in emission
    /// order. An empty result is a valid "nothing readable" outcome.
    fn recognize(&self, img: &RgbaImage, profile: OcrProfile) -> Result<Vec<OcrToken>>;
}

/// OCR engine backed by the Tesseract command-line tool.
pub struct TesseractEngine {
    executable: PathBuf,
}

impl TesseractEngine {
    /// Resolves the Tesseract executable, checking `TESSERACT_CMD`
    /// first, then the system PATH. Fails fast so a missing install
    /// surfaces before any image work starts.
    pub fn new() -> Result<Self, PipelineError> {
        if let Ok(cmd) = std::env::var("TESSERACT_CMD") {
            let path = PathBuf::from(&cmd);
            if path.exists() {
                return Ok(Self { executable: path });
            }
            return Err(PipelineError::Ocr(format!(
                "TESSERACT_CMD points at {} but nothing is there",
                cmd
            )));
        }

        match Command::new("tesseract").arg("--version").output() {
            Ok(output) if output.status.success() => Ok(Self {
                executable: PathBuf::from("tesseract"),
            }),
            _ => Err(PipelineError::Ocr(
                "tesseract not found on PATH; install Tesseract-OCR or set TESSERACT_CMD"
                    .to_string(),
            )),
        }
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, img: &RgbaImage, profile: OcrProfile) -> Result<Vec<OcrToken>> {
        // Tesseract reads from disk, so round-trip through a temp file.
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())
            .context("failed to write OCR input image")?;

        // Tesseract appends .tsv to the output base path.
        let temp_output = NamedTempFile::new()?;
        let output_base = temp_output.path().to_string_lossy().to_string();

        let mut command = Command::new(&self.executable);
        command
            .arg(temp_input.path())
            .arg(&output_base)
            .arg("-l")
            .arg("eng")
            .arg("--psm")
            .arg(profile.psm());
        if let Some(whitelist) = profile.char_whitelist() {
            command
                .arg("-c")
                .arg(format!("tessedit_char_whitelist={}", whitelist));
        }
        command.arg("tsv");

        let output = command.output().context("failed to run tesseract")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("tesseract failed: {}", stderr));
        }

        let tsv_path = format!("{}.tsv", output_base);
        let tsv_content = std::fs::read_to_string(&tsv_path)
            .map_err(|e| anyhow!("failed to read tesseract output: {}", e))?;
        let _ = std::fs::remove_file(&tsv_path);

        Ok(parse_tsv_tokens(&tsv_content))
    }
}

/// Parses Tesseract TSV output into word tokens.
///
/// TSV fields: level, page_num, block_num, par_num, line_num, word_num,
/// left, top, width, height, conf, text. Level 5 rows are words; rows
/// with negative confidence are layout artifacts and are dropped.
fn parse_tsv_tokens(tsv: &str) -> Vec<OcrToken> {
    let mut tokens = Vec::new();

    for line in tsv.lines().skip(1) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        let level: i32 = fields[0].parse().unwrap_or(-1);
        if level != 5 {
            continue;
        }

        let conf: f32 = fields[10].parse().unwrap_or(-1.0);
        let text = fields[11].trim();
        if text.is_empty() || conf < 0.0 {
            continue;
        }

        tokens.push(OcrToken {
            text: text.to_string(),
            confidence: conf,
        });
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tsv_row(level: i32, line_num: i32, conf: f32, text: &str) -> String {
        format!(
            "{}\t1\t1\t1\t{}\t1\t0\t0\t10\t10\t{}\t{}",
            level, line_num, conf, text
        )
    }

    #[test]
    fn test_parse_tsv_tokens() {
        let tsv = format!(
            "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n{}\n{}\n{}\n{}",
            tsv_row(4, 1, -1.0, "layout"),
            tsv_row(5, 1, 91.5, "L5-BCSE301P"),
            tsv_row(5, 1, 88.0, "-LO-AB1-205B-ALL"),
            tsv_row(5, 2, -1.0, "ghost"),
        );

        let tokens = parse_tsv_tokens(&tsv);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "L5-BCSE301P");
        assert_eq!(tokens[0].confidence, 91.5);
        assert_eq!(tokens[1].text, "-LO-AB1-205B-ALL");
    }

    #[test]
    fn test_parse_tsv_skips_short_rows() {
        let tsv = "level\tpage\nnot\tenough\tfields";
        assert!(parse_tsv_tokens(tsv).is_empty());
    }

    #[test]
    fn test_profile_parameters() {
        assert_eq!(OcrProfile::SingleLineCodes.psm(), "7");
        assert_eq!(OcrProfile::Block.psm(), "6");
        assert_eq!(OcrProfile::Auto.psm(), "3");
        assert!(OcrProfile::SingleLineCodes.char_whitelist().is_some());
        assert!(OcrProfile::Auto.char_whitelist().is_none());
    }
}
