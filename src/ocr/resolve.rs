//! Cell text resolution via repeated OCR passes.
//!
//! Each detected region is cropped, upscaled, and recognized under
//! every profile; the profile whose concatenated text scores the
//! highest adjusted confidence wins. A region with no token above the
//! confidence threshold resolves to an empty string, which is a valid
//! blank-cell state and still consumes a slot downstream.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::OcrConfig;
use crate::detect::{DetectedCell, Region};
use crate::ocr::engine::{OcrEngine, OcrProfile};

/// A detected cell paired with its winning text (possibly empty) and
/// the adjusted confidence that won it.
#[derive(Debug, Clone)]
pub struct ResolvedCell {
    pub cell: DetectedCell,
    pub text: String,
    pub confidence: f32,
}

/// Adjusted-confidence scoring for one profile's concatenated text.
pub trait ScoreStrategy: Sync {
    fn score(&self, text: &str, mean_confidence: f32) -> f32;
}

/// Default scorer: mean token confidence, plus a fixed bonus when the
/// text is shaped like a short identifier code. Such codes are often
/// read as scattered low-confidence fragments, so a structural match
/// outweighs the raw confidence.
pub struct ShortCodeBonus {
    bonus: f32,
}

impl ShortCodeBonus {
    pub fn new(bonus: f32) -> Self {
        Self { bonus }
    }
}

impl ScoreStrategy for ShortCodeBonus {
    fn score(&self, text: &str, mean_confidence: f32) -> f32 {
        if is_short_code(text) {
            mean_confidence + self.bonus
        } else {
            mean_confidence
        }
    }
}

/// One or two uppercase letters followed by digits, nothing else.
fn is_short_code(text: &str) -> bool {
    let letters = text.chars().take_while(|c| c.is_ascii_uppercase()).count();
    if !(1..=2).contains(&letters) {
        return false;
    }
    let rest = &text[letters..];
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
}

/// Resolves text for every detected cell.
///
/// OCR dominates the runtime, so regions are recognized in parallel;
/// the collect preserves input order, which the slot mapper depends on.
pub fn resolve_cells(
    img: &RgbaImage,
    cells: &[DetectedCell],
    engine: &dyn OcrEngine,
    scorer: &dyn ScoreStrategy,
    config: &OcrConfig,
) -> Vec<ResolvedCell> {
    cells
        .par_iter()
        .map(|cell| resolve_one(img, *cell, engine, scorer, config))
        .collect()
}

fn resolve_one(
    img: &RgbaImage,
    cell: DetectedCell,
    engine: &dyn OcrEngine,
    scorer: &dyn ScoreStrategy,
    config: &OcrConfig,
) -> ResolvedCell {
    let crop = crop_with_padding(img, cell.region, config.crop_padding);
    let upscaled = upscale(&crop, config.upscale_factor);

    let mut best_text = String::new();
    let mut best_score = f32::NEG_INFINITY;

    for profile in OcrProfile::ALL {
        let tokens = match engine.recognize(&upscaled, profile) {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(?profile, "OCR profile failed: {:#}", e);
                continue;
            }
        };

        let confident: Vec<_> = tokens
            .iter()
            .filter(|t| t.confidence > config.min_token_confidence)
            .collect();
        if confident.is_empty() {
            continue;
        }

        let text = normalize_whitespace(
            &confident
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        );
        let mean_confidence =
            confident.iter().map(|t| t.confidence).sum::<f32>() / confident.len() as f32;
        let score = scorer.score(&text, mean_confidence);

        debug!(?profile, %text, score, "profile candidate");

        if score > best_score {
            best_score = score;
            best_text = text;
        }
    }

    if best_text.is_empty() {
        debug!(region = ?cell.region, "cell resolved to blank");
    }

    ResolvedCell {
        cell,
        text: best_text,
        confidence: if best_score.is_finite() { best_score } else { 0.0 },
    }
}

/// Crops a region expanded by `padding`, clamped to image bounds.
fn crop_with_padding(img: &RgbaImage, region: Region, padding: u32) -> RgbaImage {
    let (img_w, img_h) = img.dimensions();

    let x0 = region.x.saturating_sub(padding).min(img_w.saturating_sub(1));
    let y0 = region.y.saturating_sub(padding).min(img_h.saturating_sub(1));
    let w = (region.x + region.width + padding).min(img_w) - x0;
    let h = (region.y + region.height + padding).min(img_h) - y0;

    imageops::crop_imm(img, x0, y0, w.max(1), h.max(1)).to_image()
}

/// Integer upscale with cubic interpolation to aid recognition of small
/// cell text.
fn upscale(img: &RgbaImage, factor: u32) -> RgbaImage {
    let factor = factor.max(1);
    let (w, h) = img.dimensions();
    imageops::resize(img, w * factor, h * factor, FilterType::CatmullRom)
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::SessionType;
    use crate::ocr::engine::OcrToken;
    use anyhow::Result;
    use std::collections::HashMap;

    /// Scripted engine returning canned tokens per profile.
    struct FakeEngine {
        responses: HashMap<OcrProfile, Vec<OcrToken>>,
    }

    impl FakeEngine {
        fn new(responses: Vec<(OcrProfile, Vec<(&str, f32)>)>) -> Self {
            Self {
                responses: responses
                    .into_iter()
                    .map(|(profile, tokens)| {
                        (
                            profile,
                            tokens
                                .into_iter()
                                .map(|(text, confidence)| OcrToken {
                                    text: text.to_string(),
                                    confidence,
                                })
                                .collect(),
                        )
                    })
                    .collect(),
            }
        }
    }

    impl OcrEngine for FakeEngine {
        fn recognize(&self, _img: &RgbaImage, profile: OcrProfile) -> Result<Vec<OcrToken>> {
            Ok(self.responses.get(&profile).cloned().unwrap_or_default())
        }
    }

    fn test_cell() -> DetectedCell {
        DetectedCell {
            session: SessionType::Theory,
            region: Region { x: 10, y: 10, width: 60, height: 30 },
        }
    }

    fn test_image() -> RgbaImage {
        RgbaImage::new(200, 100)
    }

    #[test]
    fn test_is_short_code() {
        assert!(is_short_code("F1"));
        assert!(is_short_code("L10"));
        assert!(is_short_code("TB2"));
        assert!(!is_short_code("BCSE301"));
        assert!(!is_short_code("L5-BCSE301P"));
        assert!(!is_short_code("12"));
        assert!(!is_short_code("F"));
        assert!(!is_short_code(""));
    }

    #[test]
    fn test_highest_confidence_profile_wins() {
        let engine = FakeEngine::new(vec![
            (OcrProfile::SingleLineCodes, vec![("L5-BCSE301P-LO-AB1-205B-ALL", 80.0)]),
            (OcrProfile::Block, vec![("LS-BCSE3O1P", 55.0)]),
            (OcrProfile::Auto, vec![("garbage", 30.0)]),
        ]);
        let scorer = ShortCodeBonus::new(15.0);
        let config = OcrConfig::default();

        let resolved = resolve_cells(&test_image(), &[test_cell()], &engine, &scorer, &config);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].text, "L5-BCSE301P-LO-AB1-205B-ALL");
        assert_eq!(resolved[0].confidence, 80.0);
    }

    #[test]
    fn test_short_code_bonus_beats_raw_confidence() {
        // The block profile reads a longer string at higher confidence,
        // but the single-line profile's "L10" earns the bonus: 70 + 15
        // beats 80.
        let engine = FakeEngine::new(vec![
            (OcrProfile::SingleLineCodes, vec![("L10", 70.0)]),
            (OcrProfile::Block, vec![("Li0)", 80.0)]),
        ]);
        let scorer = ShortCodeBonus::new(15.0);
        let config = OcrConfig::default();

        let resolved = resolve_cells(&test_image(), &[test_cell()], &engine, &scorer, &config);
        assert_eq!(resolved[0].text, "L10");
        assert_eq!(resolved[0].confidence, 85.0);
    }

    #[test]
    fn test_low_confidence_tokens_dropped() {
        let engine = FakeEngine::new(vec![
            (OcrProfile::SingleLineCodes, vec![("smudge", 10.0), ("dirt", 24.9)]),
            (OcrProfile::Block, vec![("speck", 5.0)]),
        ]);
        let scorer = ShortCodeBonus::new(15.0);
        let config = OcrConfig::default();

        let resolved = resolve_cells(&test_image(), &[test_cell()], &engine, &scorer, &config);
        assert_eq!(resolved[0].text, "");
        assert_eq!(resolved[0].confidence, 0.0);
    }

    #[test]
    fn test_tokens_concatenated_in_emission_order() {
        let engine = FakeEngine::new(vec![(
            OcrProfile::Block,
            vec![("L5-BCSE301P", 80.0), ("-LO-AB1-205B-ALL", 76.0)],
        )]);
        let scorer = ShortCodeBonus::new(15.0);
        let config = OcrConfig::default();

        let resolved = resolve_cells(&test_image(), &[test_cell()], &engine, &scorer, &config);
        assert_eq!(resolved[0].text, "L5-BCSE301P -LO-AB1-205B-ALL");
        assert_eq!(resolved[0].confidence, 78.0);
    }

    #[test]
    fn test_order_preserved_across_cells() {
        let engine = FakeEngine::new(vec![(OcrProfile::Block, vec![("X1", 60.0)])]);
        let scorer = ShortCodeBonus::new(15.0);
        let config = OcrConfig::default();

        let cells: Vec<DetectedCell> = (0..8)
            .map(|i| DetectedCell {
                session: SessionType::Theory,
                region: Region { x: i * 20, y: 10, width: 15, height: 10 },
            })
            .collect();

        let resolved = resolve_cells(&test_image(), &cells, &engine, &scorer, &config);
        let xs: Vec<u32> = resolved.iter().map(|r| r.cell.region.x).collect();
        assert_eq!(xs, (0..8).map(|i| i * 20).collect::<Vec<_>>());
    }
}
