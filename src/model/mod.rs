//! Domain model for the court search crawl
//!
//! - `CalendarDate` / `MonthTable`: search-key dates and their month lengths
//! - `CourtType` / `CourtDescriptor`: what can be searched
//! - `Task` / `TaskKey`: one (court, date) search
//! - `DecisionRecord`: one parsed result row

mod calendar;
mod court;
mod decision;
mod task;

pub use calendar::{CalendarDate, MonthTable, DEFAULT_MONTH_LENGTHS, MAX_MONTH_LENGTH};
pub use court::{CourtDescriptor, CourtType};
pub use decision::{
    DecisionRecord, DownloadLink, NaturalKey, COLUMNS, NOT_AVAILABLE, UPLOAD_PENDING,
};
pub use task::{Task, TaskKey};
