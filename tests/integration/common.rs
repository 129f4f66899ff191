//! Shared fixtures for the integration tests

use court_sweep::config::{parse_config, Config};
use court_sweep::crawler::{SearchClient, SearchError, SessionFactory};
use court_sweep::model::{CalendarDate, CourtDescriptor, CourtType};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Creates a test configuration writing into `dir`
///
/// One year of a calendar with single-day months gives 12 dates per court.
pub fn create_test_config(base_url: &str, dir: &Path) -> Config {
    let toml = format!(
        r#"
[site]
base-url = "{}"
request-timeout-secs = 5
connect-timeout-secs = 2

[crawl]
start-year = 2075
end-year = 2075
workers = 3
delay-min-ms = 0
delay-max-ms = 0
max-attempts = 1
batch-size = 5
progress-interval = 4
court-types = ["S"]

[calendar]
month-lengths = [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1]

[output]
directory = {:?}
"#,
        base_url,
        dir.to_string_lossy()
    );
    parse_config(&toml).expect("test config is valid")
}

pub fn supreme_court() -> CourtDescriptor {
    CourtDescriptor::new("264", "सर्वोच्च अदालत", CourtType::Supreme)
}

/// One well-formed result row
pub fn result_row(registration_no: &str) -> String {
    format!(
        "<tr><td>1</td><td>{}</td><td>075-WO-0001</td><td>2075-01-01</td>\
         <td>रिट</td><td>उत्प्रेषण</td><td>राम</td><td>नेपाल सरकार</td>\
         <td>2076-02-03</td><td><a href=\"download/{}.pdf\">PDF</a></td></tr>",
        registration_no, registration_no
    )
}

/// A results page holding `rows`
pub fn results_page(rows: &[String]) -> String {
    format!(
        "<html><body><table class=\"sc-table\">\
         <thead><tr><th>क्र.सं.</th></tr></thead><tbody>{}</tbody></table></body></html>",
        rows.concat()
    )
}

/// The page the site shows when a search matched nothing
pub fn not_found_page() -> String {
    "<html><body><p>फैसला भेटिएन</p></body></html>".to_string()
}

type Responder = dyn Fn(&CourtDescriptor, CalendarDate) -> Result<String, SearchError> + Send + Sync;

/// Session factory answering every search from a closure
#[derive(Clone)]
pub struct ScriptedFactory {
    responder: Arc<Responder>,
    searches: Arc<AtomicUsize>,
}

impl ScriptedFactory {
    pub fn new<R>(responder: R) -> Self
    where
        R: Fn(&CourtDescriptor, CalendarDate) -> Result<String, SearchError> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            searches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Searches run across every session so far
    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

pub struct ScriptedClient {
    responder: Arc<Responder>,
    searches: Arc<AtomicUsize>,
}

impl SearchClient for ScriptedClient {
    fn search(&mut self, court: &CourtDescriptor, date: CalendarDate) -> Result<String, SearchError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        (self.responder)(court, date)
    }
}

impl SessionFactory for ScriptedFactory {
    type Client = ScriptedClient;

    fn open_session(&self) -> Result<ScriptedClient, SearchError> {
        Ok(ScriptedClient {
            responder: Arc::clone(&self.responder),
            searches: Arc::clone(&self.searches),
        })
    }
}
