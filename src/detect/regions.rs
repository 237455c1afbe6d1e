//! Cell region detection and day/session row grouping.
//!
//! Contours in the highlight mask become padded bounding boxes, which
//! are filtered by area and shape, sorted into reading order, and
//! grouped into rows. Rows alternate theory/lab pairwise: row 0 is day
//! 0's theory row, row 1 its lab row, row 2 day 1's theory row, and so
//! on. Each row keeps at most the first 12 cells.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use tracing::{debug, warn};

use crate::config::DetectionConfig;
use crate::error::PipelineError;
use crate::schedule::slots::{DAY_LABELS, SLOTS_PER_SESSION};

/// Session row kind; selects which timing table applies downstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionType {
    Theory,
    Lab,
}

/// Axis-aligned bounding box of one detected cell candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn area(&self) -> u32 {
        self.width * self.height
    }
}

/// A region tagged with the session row it belongs to.
#[derive(Clone, Copy, Debug)]
pub struct DetectedCell {
    pub session: SessionType,
    pub region: Region,
}

/// Detects cell regions in the highlight mask and orders them into
/// day/session groups.
///
/// Returns cells in scan order: day by day, theory row then lab row,
/// left to right within each row. Fails with
/// [`PipelineError::NoCellsDetected`] when nothing survives filtering.
pub fn detect_cells(
    mask: &GrayImage,
    config: &DetectionConfig,
) -> Result<Vec<DetectedCell>, PipelineError> {
    let mut regions = filter_regions(mask, config);
    if regions.is_empty() {
        return Err(PipelineError::NoCellsDetected);
    }

    regions.sort_by_key(|r| (r.y, r.x));
    let rows = group_rows(&regions, mask.height(), config);
    Ok(tag_rows(rows))
}

/// Extracts external contours from the mask and keeps boxes whose area
/// and dimensions fall within the configured bounds, padded by a small
/// margin clamped to image bounds.
fn filter_regions(mask: &GrayImage, config: &DetectionConfig) -> Vec<Region> {
    let (img_w, img_h) = mask.dimensions();
    let image_area = (img_w as f32) * (img_h as f32);

    let contours: Vec<Contour<u32>> = find_contours(mask);
    debug!(contours = contours.len(), "found mask contours");

    let mut regions = Vec::new();
    for contour in &contours {
        if contour.border_type != BorderType::Outer {
            continue;
        }
        if contour.points.len() <= 2 {
            continue;
        }

        let min_x = contour.points.iter().map(|p| p.x).min().unwrap_or(0);
        let max_x = contour.points.iter().map(|p| p.x).max().unwrap_or(0);
        let min_y = contour.points.iter().map(|p| p.y).min().unwrap_or(0);
        let max_y = contour.points.iter().map(|p| p.y).max().unwrap_or(0);

        let region = Region {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        };

        let area_fraction = region.area() as f32 / image_area;
        if area_fraction < config.min_area_fraction || area_fraction > config.max_area_fraction {
            continue;
        }
        if region.width < config.min_cell_width || region.width > config.max_cell_width {
            continue;
        }
        if region.height < config.min_cell_height || region.height > config.max_cell_height {
            continue;
        }

        regions.push(pad_region(region, config.cell_padding, img_w, img_h));
    }

    debug!(regions = regions.len(), "regions passed area/shape filters");
    regions
}

/// Expands a region by `padding` on every side, clamped to the image.
fn pad_region(region: Region, padding: u32, img_w: u32, img_h: u32) -> Region {
    let x = region.x.saturating_sub(padding);
    let y = region.y.saturating_sub(padding);
    let width = (region.x + region.width + padding).min(img_w) - x;
    let height = (region.y + region.height + padding).min(img_h) - y;
    Region { x, y, width, height }
}

/// Splits the (y, x)-sorted region list into rows. A vertical step
/// larger than the configured fraction of image height starts a new
/// row; cells within a row are re-sorted left to right.
fn group_rows(regions: &[Region], img_h: u32, config: &DetectionConfig) -> Vec<Vec<Region>> {
    let gap_px = (config.row_gap_fraction * img_h as f32) as u32;

    let mut rows: Vec<Vec<Region>> = Vec::new();
    let mut current: Vec<Region> = Vec::new();
    let mut last_y: Option<u32> = None;

    for &region in regions {
        if let Some(prev) = last_y {
            if region.y.abs_diff(prev) > gap_px && !current.is_empty() {
                rows.push(std::mem::take(&mut current));
            }
        }
        current.push(region);
        last_y = Some(region.y);
    }
    if !current.is_empty() {
        rows.push(current);
    }

    for row in &mut rows {
        row.sort_by_key(|r| r.x);
    }
    rows
}

/// Assigns rows to alternating theory/lab sessions, two rows per day,
/// capping each row at the 12-slot template.
fn tag_rows(rows: Vec<Vec<Region>>) -> Vec<DetectedCell> {
    let max_rows = DAY_LABELS.len() * 2;
    let mut cells = Vec::new();

    for (idx, row) in rows.into_iter().enumerate() {
        if idx >= max_rows {
            warn!(row = idx, cells = row.len(), "row beyond the 7-day template, discarding");
            continue;
        }

        let session = if idx % 2 == 0 { SessionType::Theory } else { SessionType::Lab };

        if row.len() > SLOTS_PER_SESSION {
            warn!(
                row = idx,
                extra = row.len() - SLOTS_PER_SESSION,
                "row exceeds the 12-slot template, discarding extra cells"
            );
        } else if row.len() < SLOTS_PER_SESSION {
            // The slot mapper is purely positional, so an undercounted
            // row shifts every later binding for this day.
            warn!(row = idx, cells = row.len(), "row has fewer than 12 cells");
        }

        cells.extend(
            row.into_iter()
                .take(SLOTS_PER_SESSION)
                .map(|region| DetectedCell { session, region }),
        );
    }

    cells
}
