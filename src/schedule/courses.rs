//! Course-code to course-name lookup table.
//!
//! Loaded from a two-column CSV (code, name). The header row is
//! skipped, codes are uppercased, and the first occurrence of each
//! base code wins. Suffixed codes (e.g. `BCSE308P`) are stored both
//! ways so a lookup can fall back from the suffixed form to the bare
//! 4+3 code.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

use crate::schedule::parse::base_course_code;

/// Immutable course-name lookup, shared read-only across pipeline runs.
#[derive(Debug, Clone, Default)]
pub struct CourseTable {
    names: HashMap<String, String>,
}

impl CourseTable {
    /// Loads the table from a CSV file. Malformed rows (fewer than two
    /// columns, empty fields, codes that don't look like course codes)
    /// are skipped without failing the load.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .context(format!("failed to open course table: {}", path.display()))?;
        let reader = BufReader::new(file);

        let mut names = HashMap::new();
        let mut seen_bases = Vec::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result.context("failed to read line from course table")?;

            // Header row
            if line_num == 0 {
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }

            let Some((code, name)) = line.split_once(',') else {
                debug!(row = line_num + 1, "skipping row without two columns");
                continue;
            };
            let code = code.trim().to_uppercase();
            let name = name.trim();
            if code.is_empty() || name.is_empty() {
                continue;
            }

            let Some(base) = base_course_code(&code) else {
                debug!(row = line_num + 1, %code, "skipping non-course-code row");
                continue;
            };
            let base = base.to_string();
            if seen_bases.contains(&base) {
                continue;
            }

            names.insert(base.clone(), name.to_string());
            if code.len() > base.len() {
                names.insert(code, name.to_string());
            }
            seen_bases.push(base);
        }

        Ok(Self { names })
    }

    /// Resolves the display name for a canonical course code: the full
    /// suffixed code first, then the bare 4+3 code.
    pub fn resolve_name(&self, actual_code: &str) -> Option<&str> {
        if let Some(name) = self.names.get(actual_code) {
            return Some(name);
        }
        base_course_code(actual_code).and_then(|base| self.names.get(base).map(String::as_str))
    }

    /// Number of stored code mappings.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
