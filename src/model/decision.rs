//! Parsed decision rows

use crate::model::{CalendarDate, TaskKey};
use serde::{Deserialize, Serialize};

/// Sentinel stored when the row shows the "upload pending" icon
pub const UPLOAD_PENDING: &str = "Upload Pending";

/// Sentinel stored when the row offers neither a link nor a pending icon
pub const NOT_AVAILABLE: &str = "N/A";

/// The download column of a decision row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DownloadLink {
    /// Absolute URL of the decision document
    Url(String),
    /// The site shows an error icon: the document has not been uploaded yet
    UploadPending,
    /// No document and no pending marker
    Unavailable,
}

impl DownloadLink {
    pub fn is_url(&self) -> bool {
        matches!(self, Self::Url(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::UploadPending => UPLOAD_PENDING,
            Self::Unavailable => NOT_AVAILABLE,
        }
    }
}

impl From<String> for DownloadLink {
    fn from(value: String) -> Self {
        match value.trim() {
            UPLOAD_PENDING => Self::UploadPending,
            "" | NOT_AVAILABLE => Self::Unavailable,
            _ => Self::Url(value),
        }
    }
}

impl From<DownloadLink> for String {
    fn from(link: DownloadLink) -> Self {
        match link {
            DownloadLink::Url(url) => url,
            other => other.as_str().to_string(),
        }
    }
}

/// Key used to collapse duplicate rows when merging checkpoints
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NaturalKey {
    pub registration_no: String,
    pub court_id: String,
    pub search_date: CalendarDate,
}

/// Column names of checkpoint and dataset files, in order
pub const COLUMNS: [&str; 16] = [
    "search_date",
    "court_type_code",
    "court_type_name",
    "court_id",
    "court_name",
    "serial_no",
    "registration_no",
    "case_no",
    "registration_date",
    "case_type",
    "case_name",
    "plaintiff",
    "defendant",
    "decision_date",
    "download_url",
    "scraped_at",
];

/// One row of a search result table, plus where and when it was found
///
/// Field order is the column order of checkpoint and dataset files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub search_date: CalendarDate,
    pub court_type_code: String,
    pub court_type_name: String,
    pub court_id: String,
    pub court_name: String,
    pub serial_no: String,
    pub registration_no: String,
    pub case_no: String,
    pub registration_date: String,
    pub case_type: String,
    pub case_name: String,
    pub plaintiff: String,
    pub defendant: String,
    pub decision_date: String,
    pub download_url: DownloadLink,
    /// RFC 3339 timestamp of the search that produced this row
    pub scraped_at: String,
}

impl DecisionRecord {
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            registration_no: self.registration_no.clone(),
            court_id: self.court_id.clone(),
            search_date: self.search_date,
        }
    }

    /// The task that produced this row
    pub fn task_key(&self) -> TaskKey {
        TaskKey {
            court_id: self.court_id.clone(),
            date: self.search_date,
        }
    }
}
