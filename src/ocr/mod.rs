pub mod engine;
pub mod resolve;

pub use engine::{OcrEngine, OcrProfile, OcrToken, TesseractEngine};
pub use resolve::{resolve_cells, ResolvedCell, ScoreStrategy, ShortCodeBonus};
