//! HTML parser for search results and court lists
//!
//! This module turns raw search-form responses into decision records:
//! - Result rows from the `sc-table` results table
//! - The "not found" page the site returns for dates with no registrations
//! - Court `<option>` lists returned by the court-list endpoint

use crate::model::{CalendarDate, CourtDescriptor, CourtType, DecisionRecord, DownloadLink};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Phrase the site prints when a search matched nothing ("not found")
pub const NOT_FOUND_MARKER: &str = "भेटिएन";

/// Fewest cells a result row must have to be read
pub const MIN_ROW_CELLS: usize = 10;

/// What a search response turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedPage {
    /// The results table was present; holds every well-formed row
    Decisions(Vec<DecisionRecord>),

    /// The site reported no matches
    NotFound,

    /// Neither a results table nor the not-found message
    Unrecognized,
}

impl ParsedPage {
    /// Records on the page; empty unless the table was found
    pub fn into_records(self) -> Vec<DecisionRecord> {
        match self {
            Self::Decisions(records) => records,
            Self::NotFound | Self::Unrecognized => Vec::new(),
        }
    }
}

/// Where a search response came from
#[derive(Debug, Clone, Copy)]
pub struct SearchContext<'a> {
    /// Base for resolving relative download links
    pub base_url: &'a Url,
    pub court: &'a CourtDescriptor,
    pub date: CalendarDate,
    /// RFC 3339 time of the search
    pub scraped_at: &'a str,
}

struct ResultSelectors {
    table: Selector,
    row: Selector,
    cell: Selector,
    link: Selector,
    image: Selector,
}

impl ResultSelectors {
    fn new() -> Option<Self> {
        Some(Self {
            table: Selector::parse("table.sc-table").ok()?,
            row: Selector::parse("tbody tr").ok()?,
            cell: Selector::parse("td").ok()?,
            link: Selector::parse("a[href]").ok()?,
            image: Selector::parse("img").ok()?,
        })
    }
}

/// Parses one search response
///
/// # Row Rules
///
/// | Condition | Action |
/// |-----------|--------|
/// | Fewer than 10 `td` cells | Row skipped |
/// | Empty registration number | Row skipped |
/// | `a[href]` in the download cell | Absolute URL |
/// | `img` with `error.png` source | `Upload Pending` |
/// | Anything else | `N/A` |
///
/// # Arguments
///
/// * `html` - The decoded response body
/// * `context` - Court, date and base URL of the search
///
/// # Returns
///
/// The classified page. A results table with no usable rows is
/// `Decisions` with an empty list.
pub fn parse_search_page(html: &str, context: &SearchContext<'_>) -> ParsedPage {
    let Some(selectors) = ResultSelectors::new() else {
        return ParsedPage::Unrecognized;
    };
    let document = Html::parse_document(html);

    let Some(table) = document.select(&selectors.table).next() else {
        if html.contains(NOT_FOUND_MARKER) {
            return ParsedPage::NotFound;
        }
        return ParsedPage::Unrecognized;
    };

    let records = table
        .select(&selectors.row)
        .filter_map(|row| parse_row(row, &selectors, context))
        .collect();
    ParsedPage::Decisions(records)
}

fn parse_row(
    row: ElementRef<'_>,
    selectors: &ResultSelectors,
    context: &SearchContext<'_>,
) -> Option<DecisionRecord> {
    let cells: Vec<ElementRef<'_>> = row.select(&selectors.cell).collect();
    if cells.len() < MIN_ROW_CELLS {
        return None;
    }

    let registration_no = cell_text(cells[1]);
    if registration_no.is_empty() {
        return None;
    }

    let court = context.court;
    Some(DecisionRecord {
        search_date: context.date,
        court_type_code: court.type_code().to_string(),
        court_type_name: court.type_name().to_string(),
        court_id: court.id.clone(),
        court_name: court.name.clone(),
        serial_no: cell_text(cells[0]),
        registration_no,
        case_no: cell_text(cells[2]),
        registration_date: cell_text(cells[3]),
        case_type: cell_text(cells[4]),
        case_name: cell_text(cells[5]),
        plaintiff: cell_text(cells[6]),
        defendant: cell_text(cells[7]),
        decision_date: cell_text(cells[8]),
        download_url: download_link(cells[9], selectors, context.base_url),
        scraped_at: context.scraped_at.to_string(),
    })
}

/// Visible text of an element: trimmed text nodes joined by single spaces
fn cell_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn download_link(cell: ElementRef<'_>, selectors: &ResultSelectors, base_url: &Url) -> DownloadLink {
    let href = cell
        .select(&selectors.link)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .find(|href| !href.is_empty());
    if let Some(href) = href {
        return match base_url.join(href) {
            Ok(url) => DownloadLink::Url(url.to_string()),
            Err(_) => DownloadLink::Url(href.to_string()),
        };
    }

    let pending = cell
        .select(&selectors.image)
        .filter_map(|img| img.value().attr("src"))
        .any(|src| src.contains("error.png"));
    if pending {
        DownloadLink::UploadPending
    } else {
        DownloadLink::Unavailable
    }
}

/// Parses the court-list endpoint's `<option>` elements
///
/// Options with an empty value (the "select a court" placeholder) are
/// dropped. Labels are trimmed.
pub fn parse_court_options(html: &str, court_type: CourtType) -> Vec<CourtDescriptor> {
    let Ok(option) = Selector::parse("option") else {
        return Vec::new();
    };
    // The endpoint returns bare <option> elements; a fragment keeps them.
    let fragment = Html::parse_fragment(&format!("<select>{}</select>", html));

    fragment
        .select(&option)
        .filter_map(|element| {
            let value = element.value().attr("value")?.trim();
            if value.is_empty() {
                return None;
            }
            Some(CourtDescriptor::new(
                value,
                cell_text(element),
                court_type,
            ))
        })
        .collect()
}
