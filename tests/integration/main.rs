//! Integration tests for Court-Sweep

mod common;
mod crawl_tests;
mod http_tests;
