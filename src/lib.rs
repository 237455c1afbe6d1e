//! Extracts a structured weekly schedule from a timetable grid image.
//!
//! The pipeline runs four stages in strict order, each blind to raw
//! pixels once its predecessor has produced structured data:
//!
//! 1. Region detection — contours in a binarized highlight mask become
//!    cell bounding boxes, grouped into day rows of theory and lab
//!    sessions.
//! 2. Cell text resolution — each region is recognized under several
//!    OCR profiles and the highest-scoring text wins.
//! 3. Slot mapping — a positional state machine binds each cell to a
//!    (day, session, slot) timing window.
//! 4. Schedule composition — course codes and rooms are parsed out,
//!    names resolved against the course table, days sorted, and
//!    contiguous lab periods merged.
//!
//! Each run is independent and synchronous; only OCR fans out across
//! regions, and always reassembles in region order.

pub mod config;
pub mod detect;
pub mod error;
pub mod ocr;
pub mod schedule;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use ocr::{OcrEngine, TesseractEngine};
pub use schedule::{CourseTable, WeekSchedule};

use anyhow::Result;
use image::RgbaImage;
use tracing::info;

use ocr::ShortCodeBonus;
use schedule::SlotMapper;

/// Runs the full extraction pipeline on a decoded bitmap.
///
/// Fails only on structural preconditions: an invalid timing table or
/// an image in which no cells can be detected. Everything else
/// degrades per cell.
pub fn extract_schedule(
    img: &RgbaImage,
    courses: &CourseTable,
    engine: &dyn OcrEngine,
    config: &PipelineConfig,
) -> Result<WeekSchedule> {
    config.timings.validate()?;

    let mask = detect::build_highlight_mask(img, &config.detection);
    let cells = detect::detect_cells(&mask, &config.detection)?;
    info!(cells = cells.len(), "detected cell regions");

    let scorer = ShortCodeBonus::new(config.ocr.short_code_bonus);
    let resolved = ocr::resolve_cells(img, &cells, engine, &scorer, &config.ocr);
    let readable = resolved.iter().filter(|c| !c.text.is_empty()).count();
    info!(cells = resolved.len(), readable, "resolved cell text");

    let bindings = SlotMapper::new(&config.timings).map_cells(&resolved);
    info!(bindings = bindings.len(), "bound periods to time slots");

    Ok(schedule::compose_week(&bindings, courses))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result as AnyResult;
    use crate::ocr::{OcrProfile, OcrToken};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Engine that records invocations; the empty-image test must show
    /// it is never reached.
    struct CountingEngine {
        calls: AtomicUsize,
    }

    impl OcrEngine for CountingEngine {
        fn recognize(&self, _img: &RgbaImage, _profile: OcrProfile) -> AnyResult<Vec<OcrToken>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_blank_image_aborts_before_ocr() {
        // All-black source: luma 0 everywhere makes the whole image one
        // giant foreground blob, which the area filter rejects.
        let img = RgbaImage::new(400, 300);
        let engine = CountingEngine { calls: AtomicUsize::new(0) };
        let courses = CourseTable::default();
        let config = PipelineConfig::default();

        let err = extract_schedule(&img, &courses, &engine, &config).unwrap_err();
        assert!(err.downcast_ref::<PipelineError>().is_some_and(|e| matches!(
            e,
            PipelineError::NoCellsDetected
        )));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    /// Engine that reads every crop as the same valid period code.
    struct UniformEngine;

    impl OcrEngine for UniformEngine {
        fn recognize(&self, _img: &RgbaImage, profile: OcrProfile) -> AnyResult<Vec<OcrToken>> {
            if profile == OcrProfile::Block {
                Ok(vec![OcrToken {
                    text: "F2-BMAT202L-TH-AB3-206-ALL".to_string(),
                    confidence: 90.0,
                }])
            } else {
                Ok(Vec::new())
            }
        }
    }

    #[test]
    fn test_synthetic_grid_end_to_end() {
        use image::Rgba;

        // One day: a theory row and a lab row of 12 dark cells each on
        // a white background.
        let mut img = RgbaImage::from_pixel(1000, 800, Rgba([255, 255, 255, 255]));
        for row_y in [100u32, 200u32] {
            for i in 0..12u32 {
                for y in row_y..row_y + 40 {
                    for x in (50 + i * 80)..(50 + i * 80 + 60) {
                        img.put_pixel(x, y, Rgba([30, 30, 30, 255]));
                    }
                }
            }
        }

        let mut courses_csv = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write;
        writeln!(courses_csv, "code,name\nBMAT202,Calculus").unwrap();
        let courses = CourseTable::from_csv(courses_csv.path()).unwrap();

        let config = PipelineConfig::default();
        let schedule = extract_schedule(&img, &courses, &UniformEngine, &config).unwrap();

        // 12 theory + 12 lab periods, all on day 0; the L-suffixed code
        // is a theory course, so nothing merges.
        let monday = schedule.day("MON").unwrap();
        assert_eq!(monday.len(), 24);
        assert!(monday.iter().all(|p| p.course_name == "Calculus"));
        assert!(monday.iter().all(|p| p.location == "AB3-206"));
        assert_eq!(schedule.day("TUE").unwrap().len(), 0);
        assert_eq!(schedule.period_count(), 24);
    }

    #[test]
    fn test_invalid_timing_table_rejected_up_front() {
        let img = RgbaImage::new(400, 300);
        let engine = CountingEngine { calls: AtomicUsize::new(0) };
        let courses = CourseTable::default();
        let mut config = PipelineConfig::default();
        config.timings.theory.pop();

        let err = extract_schedule(&img, &courses, &engine, &config).unwrap_err();
        assert!(err.downcast_ref::<PipelineError>().is_some_and(|e| matches!(
            e,
            PipelineError::TimingTable(_)
        )));
    }
}
