//! Tests against a mock court site
//!
//! These use wiremock to stand in for the search form and court-list
//! endpoints. The HTTP client is blocking, so every call into the crate
//! runs on the blocking pool.

use crate::common::{create_test_config, not_found_page, result_row, results_page, supreme_court};
use court_sweep::crawler::{
    build_http_client, crawl, discover_courts, fetch_court_list, HttpSessionFactory, SearchClient,
    SearchError, SessionFactory,
};
use court_sweep::model::{CourtType, DownloadLink};
use court_sweep::output::read_dataset;
use court_sweep::{CalendarDate, ShutdownFlag, SweepError};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HIGH_COURT_OPTIONS: &str = "<option value=\"\">-- अदालत छान्नुहोस् --</option>\
    <option value=\"101\"> उच्च अदालत पाटन </option>\
    <option value=\"102\">उच्च अदालत जनकपुर</option>";

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_court_list() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cp/welcome/get_courts"))
        .and(body_string_contains("court_type=A"))
        .respond_with(ResponseTemplate::new(200).set_body_string(HIGH_COURT_OPTIONS))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&format!("{}/cp/", server.uri()), dir.path());

    let courts = tokio::task::spawn_blocking(move || {
        let client = build_http_client(&config.site).unwrap();
        fetch_court_list(&client, &config.site, CourtType::High)
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(courts.len(), 2);
    assert_eq!(courts[0].id, "101");
    assert_eq!(courts[0].name, "उच्च अदालत पाटन");
    assert_eq!(courts[0].court_type, CourtType::High);
    assert_eq!(courts[1].id, "102");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_discover_courts_without_courts_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cp/welcome/get_courts"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<option value=\"\">-- छान्नुहोस् --</option>"),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&format!("{}/cp/", server.uri()), dir.path());

    let result = tokio::task::spawn_blocking(move || discover_courts(&config))
        .await
        .unwrap();

    assert!(matches!(result, Err(SweepError::NoCourts(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_search_session_posts_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cp/"))
        .and(body_string_contains("court_type=S"))
        .and(body_string_contains("court_id=264"))
        .and(body_string_contains("darta_date=2075-03-01"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(&[result_row("R-9")])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&format!("{}/cp/", server.uri()), dir.path());

    let body = tokio::task::spawn_blocking(move || {
        let factory = HttpSessionFactory::new(&config.site).unwrap();
        let mut session = factory.open_session().unwrap();
        let date: CalendarDate = "2075-03-01".parse().unwrap();
        session.search(&supreme_court(), date)
    })
    .await
    .unwrap()
    .unwrap();

    assert!(body.contains("R-9"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_search_status_errors_are_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cp/"))
        .and(body_string_contains("darta_date=2075-01-01"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cp/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&format!("{}/cp/", server.uri()), dir.path());

    let (unavailable, missing) = tokio::task::spawn_blocking(move || {
        let factory = HttpSessionFactory::new(&config.site).unwrap();
        let mut session = factory.open_session().unwrap();
        let court = supreme_court();
        (
            session.search(&court, "2075-01-01".parse().unwrap()),
            session.search(&court, "2075-02-01".parse().unwrap()),
        )
    })
    .await
    .unwrap();

    let unavailable = unavailable.unwrap_err();
    assert!(matches!(unavailable, SearchError::Status(503)));
    assert!(unavailable.is_transient());

    let missing = missing.unwrap_err();
    assert!(matches!(missing, SearchError::Status(404)));
    assert!(!missing.is_transient());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_full_crawl_against_mock_site() {
    let server = MockServer::start().await;
    let base_url = format!("{}/cp/", server.uri());

    Mock::given(method("POST"))
        .and(path("/cp/welcome/get_courts"))
        .and(body_string_contains("court_type=S"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<option value=\"264\">सर्वोच्च अदालत</option>"),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cp/"))
        .and(body_string_contains("darta_date=2075-04-01"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(&[result_row("R-1")])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cp/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(not_found_page()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path());
    let dataset_path = config.output.dataset_path();

    let report = tokio::task::spawn_blocking(move || crawl(&config, false, ShutdownFlag::new()))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.total_tasks, 12);
    assert_eq!(report.totals.tasks_processed, 12);
    assert_eq!(report.totals.decisions_found, 1);
    assert_eq!(report.totals.errors, 0);

    let records = read_dataset(&dataset_path).unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.registration_no, "R-1");
    assert_eq!(record.court_id, "264");
    assert_eq!(record.search_date.to_string(), "2075-04-01");
    assert_eq!(
        record.download_url,
        DownloadLink::Url(format!("{}download/R-1.pdf", base_url))
    );
}
