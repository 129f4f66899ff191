use crate::model::{CalendarDate, CourtDescriptor};
use std::fmt;
use std::sync::Arc;

/// Identity of a search: one court on one date
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey {
    pub court_id: String,
    pub date: CalendarDate,
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.court_id, self.date)
    }
}

/// A single unit of crawl work
#[derive(Debug, Clone)]
pub struct Task {
    pub court: Arc<CourtDescriptor>,
    pub date: CalendarDate,

    /// Position in the canonical task ordering
    pub sequence_index: usize,
}

impl Task {
    pub fn key(&self) -> TaskKey {
        TaskKey {
            court_id: self.court.id.clone(),
            date: self.date,
        }
    }
}
