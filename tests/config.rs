use std::time::Duration;

use assert_matches::assert_matches;

use kegg_analyzer::config::ConfigLoader;
use kegg_analyzer::error::KeggError;

#[test]
fn resolve_from_explicit_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("kegg-analyzer.json");
    std::fs::write(
        &path,
        r#"{"reference_base_url": "http://localhost:9000", "cache_dir": "/tmp/kegg-ko", "timeout_secs": 12}"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.reference_base_url, "http://localhost:9000");
    assert_eq!(resolved.cache_dir.as_str(), "/tmp/kegg-ko");
    assert_eq!(resolved.timeout, Duration::from_secs(12));
}

#[test]
fn missing_explicit_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(KeggError::ConfigRead(_))
    );
}

#[test]
fn invalid_json_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("kegg-analyzer.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(KeggError::ConfigParse(_))
    );
}
