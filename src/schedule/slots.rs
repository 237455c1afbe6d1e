//! Positional slot assignment.
//!
//! Walks the resolved cell sequence through the fixed
//! day x session x slot template. Assignment is purely positional: the
//! Nth cell seen for a (day, session) row binds to the Nth timing
//! entry whether or not its text is usable, so blank and garbled cells
//! still consume their slot. This is what keeps valid cells aligned
//! with their printed column.

use tracing::{debug, warn};

use crate::config::TimingConfig;
use crate::detect::SessionType;
use crate::ocr::ResolvedCell;
use crate::schedule::parse::{is_period_code, normalize_text};

/// Slots per session row. Theory and lab rows each bind this many
/// timing windows per day.
pub const SLOTS_PER_SESSION: usize = 12;

/// Weekday labels in template order.
pub const DAY_LABELS: [&str; 7] = ["MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

/// One cell's binding to a (day, session, slot) coordinate.
#[derive(Debug, Clone)]
pub struct SlotBinding {
    /// Index into [`DAY_LABELS`].
    pub day: usize,
    pub session: SessionType,
    pub slot: usize,
    /// Timing window from the session's table, `HH:MM-HH:MM`.
    pub time_range: String,
    /// Cleaned period-code text.
    pub text: String,
}

/// The slot-assignment state machine.
pub struct SlotMapper<'a> {
    timings: &'a TimingConfig,
    day: usize,
    session: SessionType,
    slot: usize,
}

impl<'a> SlotMapper<'a> {
    pub fn new(timings: &'a TimingConfig) -> Self {
        Self {
            timings,
            day: 0,
            session: SessionType::Theory,
            slot: 0,
        }
    }

    /// Binds every cell in order, recording those whose cleaned text
    /// matches the period-code grammar. Halts once the day index runs
    /// past the 7-day calendar.
    pub fn map_cells(mut self, cells: &[ResolvedCell]) -> Vec<SlotBinding> {
        let mut bindings = Vec::new();

        for (index, resolved) in cells.iter().enumerate() {
            if self.day >= DAY_LABELS.len() {
                warn!(
                    remaining = cells.len() - index,
                    "cells remain after the last calendar day, stopping"
                );
                break;
            }

            if resolved.cell.session != self.session {
                // The detector's row tag and the positional walk have
                // drifted apart; every binding from here on is suspect.
                debug!(
                    day = DAY_LABELS[self.day],
                    slot = self.slot,
                    "cell session tag disagrees with positional state"
                );
            }

            let table = match self.session {
                SessionType::Theory => &self.timings.theory,
                SessionType::Lab => &self.timings.lab,
            };
            let time_range = &table[self.slot];

            let text = normalize_text(&resolved.text);
            if is_period_code(&text) {
                debug!(
                    day = DAY_LABELS[self.day],
                    slot = self.slot,
                    %text,
                    %time_range,
                    "bound period"
                );
                bindings.push(SlotBinding {
                    day: self.day,
                    session: self.session,
                    slot: self.slot,
                    time_range: time_range.clone(),
                    text,
                });
            } else if !text.is_empty() {
                debug!(
                    day = DAY_LABELS[self.day],
                    slot = self.slot,
                    %text,
                    "text does not match the period grammar, slot consumed"
                );
            }

            self.advance();
        }

        bindings
    }

    /// Moves to the next slot; rolls theory into lab, and lab into the
    /// next day's theory row.
    fn advance(&mut self) {
        self.slot += 1;
        if self.slot == SLOTS_PER_SESSION {
            self.slot = 0;
            match self.session {
                SessionType::Theory => self.session = SessionType::Lab,
                SessionType::Lab => {
                    self.session = SessionType::Theory;
                    self.day += 1;
                }
            }
        }
    }
}
