#![allow(dead_code)]

use mediascrape::config::ScraperConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Config with hidden progress bars.
pub fn quiet(workers: usize) -> ScraperConfig {
    ScraperConfig {
        workers,
        progress: false,
        ..ScraperConfig::default()
    }
}

/// Serves `body` at `route`: HEAD answers with `content_type`, GET with the bytes.
pub async fn mount_media(server: &MockServer, route: &str, content_type: &str, body: &[u8]) {
    Mock::given(method("HEAD"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", content_type))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_vec(), content_type))
        .mount(server)
        .await;
}

pub fn url(server: &MockServer, route: &str) -> String {
    format!("{}{}", server.uri(), route)
}

/// File names in `dir`, sorted.
pub fn files_in(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
