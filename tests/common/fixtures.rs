//! Mock GBIF API and archive fixtures

use gbif_dl::Config;
use serde_json::json;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Publisher used by the mock catalog
pub const PUBLISHER: &str = "b351a324-872b-47c5-a476-c08b28f73e73";

/// Tab-separated occurrence file shipped in every fixture archive
pub const OCCURRENCE_TSV: &str =
    "id\tscientificName\tlocality\n1\tPuma concolor\tSierra Nevada, CA\n2\tLynx rufus\tYosemite\n";

/// Zip archive bytes holding the given files
pub fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, content) in files {
        writer
            .start_file(*name, options)
            .expect("Failed to start zip entry");
        writer.write_all(content).expect("Failed to write zip entry");
    }
    writer
        .finish()
        .expect("Failed to finish zip archive")
        .into_inner()
}

/// Configuration pointing at the mock server, rooted in `dir`, with no delay
pub fn config_for(server: &MockServer, dir: &Path, page_size: u32) -> Config {
    let mut config = Config::default();
    config.api.base_url =
        Url::parse(&format!("{}/v1/", server.uri())).expect("Mock server URI is a valid URL");
    config.api.page_size = page_size;
    config.api.request_delay = Duration::ZERO;
    config.api.timeout = Duration::from_secs(5);
    config.download.download_dir = dir.join("gbif_downloads");
    config.convert.root_dir = dir.join("gbif_downloads");
    config
}

/// Mount one catalog page for [`PUBLISHER`]
pub async fn mount_search_page(
    server: &MockServer,
    offset: u64,
    limit: u32,
    keys: &[&str],
    end_of_records: bool,
) {
    let results: Vec<_> = keys
        .iter()
        .map(|key| json!({"key": key, "title": format!("Dataset {key}")}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/v1/dataset/search"))
        .and(query_param("publishingOrg", PUBLISHER))
        .and(query_param("offset", offset.to_string()))
        .and(query_param("limit", limit.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "offset": offset,
            "limit": limit,
            "endOfRecords": end_of_records,
            "count": keys.len(),
            "results": results,
        })))
        .expect(1)
        .mount(server)
        .await;
}

/// Mount a dataset detail record and, when `archive` is given, its archive
pub async fn mount_dataset(server: &MockServer, key: &str, archive: Option<Vec<u8>>) {
    let endpoints = match &archive {
        Some(_) => json!([
            {"type": "EML", "url": format!("{}/eml/{key}.xml", server.uri())},
            {"type": "DWC_ARCHIVE", "url": format!("{}/archive/{key}.zip", server.uri())}
        ]),
        None => json!([{"type": "EML", "url": format!("{}/eml/{key}.xml", server.uri())}]),
    };
    Mock::given(method("GET"))
        .and(path(format!("/v1/dataset/{key}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "key": key,
            "title": format!("Dataset {key}"),
            "endpoints": endpoints,
        })))
        .mount(server)
        .await;

    if let Some(body) = archive {
        Mock::given(method("GET"))
            .and(path(format!("/archive/{key}.zip")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .expect(1)
            .mount(server)
            .await;
    }
}
