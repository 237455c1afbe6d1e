pub mod compose;
pub mod courses;
pub mod parse;
pub mod slots;

pub use compose::{compose_week, PeriodInfo, WeekSchedule};
pub use courses::CourseTable;
pub use slots::{SlotBinding, SlotMapper, DAY_LABELS, SLOTS_PER_SESSION};
