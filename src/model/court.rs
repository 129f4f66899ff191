//! Court types and court descriptors

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The court categories offered by the search form
///
/// Each variant maps to the short code the site expects in its
/// `court_type` form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CourtType {
    Supreme,
    High,
    District,
    Special,
    ForeignEmploymentTribunal,
    RevenueTribunal,
    Administrative,
}

impl CourtType {
    /// Every court type in the order the site lists them
    pub const ALL: [CourtType; 7] = [
        Self::Supreme,
        Self::High,
        Self::District,
        Self::Special,
        Self::ForeignEmploymentTribunal,
        Self::RevenueTribunal,
        Self::Administrative,
    ];

    /// The form code for this court type
    pub fn code(&self) -> &'static str {
        match self {
            Self::Supreme => "S",
            Self::High => "A",
            Self::District => "D",
            Self::Special => "T",
            Self::ForeignEmploymentTribunal => "B",
            Self::RevenueTribunal => "R",
            Self::Administrative => "AD",
        }
    }

    /// The Nepali display name used by the site
    pub fn name(&self) -> &'static str {
        match self {
            Self::Supreme => "सर्वोच्च अदालत",
            Self::High => "उच्च अदालत",
            Self::District => "जिल्ला अदालत",
            Self::Special => "विशेष अदालत",
            Self::ForeignEmploymentTribunal => "वैदेशिक रोजगार न्यायाधिकरण",
            Self::RevenueTribunal => "राजस्व न्यायाधिकरण",
            Self::Administrative => "प्रशासकीय अदालत",
        }
    }

    /// Parses a form code such as `"S"` or `"AD"` (case-insensitive)
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.code().eq_ignore_ascii_case(code))
    }

    /// True for court types whose decisions live on separate tribunal sites
    ///
    /// The central search form answers for these types with pages that never
    /// contain a results table, so they are left out unless listed explicitly.
    pub fn redirects_externally(&self) -> bool {
        matches!(
            self,
            Self::ForeignEmploymentTribunal | Self::RevenueTribunal | Self::Administrative
        )
    }

    /// The court types searched when the configuration names none
    pub fn default_set() -> Vec<CourtType> {
        Self::ALL
            .into_iter()
            .filter(|t| !t.redirects_externally())
            .collect()
    }
}

impl fmt::Display for CourtType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<String> for CourtType {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_code(&value).ok_or(ConfigError::InvalidCourtType(value))
    }
}

impl From<CourtType> for String {
    fn from(court_type: CourtType) -> Self {
        court_type.code().to_string()
    }
}

/// One court as listed by the site's court-list endpoint
///
/// Fetched once per court type and shared (behind `Arc`) by every task
/// that searches it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CourtDescriptor {
    /// The site's identifier, sent as the `court_id` form field
    pub id: String,

    /// Display name from the court-list `<option>` label
    pub name: String,

    pub court_type: CourtType,
}

impl CourtDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, court_type: CourtType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            court_type,
        }
    }

    pub fn type_code(&self) -> &'static str {
        self.court_type.code()
    }

    pub fn type_name(&self) -> &'static str {
        self.court_type.name()
    }
}
