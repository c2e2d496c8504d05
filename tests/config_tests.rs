//! Integration tests for configuration files.
//!
//! These tests verify that:
//! - Rank overrides from a file change which decoder a proxy picks
//! - Malformed or out-of-range files are rejected before registration

use decproxy::bus::Bus;
use decproxy::config::CoolConfig;
use decproxy::decproxy::{DECPROXY, resolve};
use decproxy::error::Error;
use decproxy::format::Caps;
use decproxy::registry::{FactoryRegistry, Rank};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_rank_override_from_file() {
    let file = write_config(
        r#"
        [rank]
        fakeadec = 300
        notinstalled = 500

        [decode]
        in_size = 6
        "#,
    );
    let config = CoolConfig::from_file(file.path()).unwrap();
    assert_eq!(config.decode.in_size, Some(6));

    let registry = Arc::new(FactoryRegistry::new());
    decproxy::plugin_init(&registry, &Bus::default(), &config).unwrap();

    // The audio placeholder now outranks the general proxy.
    let fakeadec = registry.find("fakeadec").unwrap();
    assert_eq!(registry.rank_of(fakeadec.as_ref()), Rank(300));
    let chosen = resolve(&registry, &Caps::new_simple("audio/x-media"), Some(DECPROXY)).unwrap();
    assert_eq!(chosen.name(), "fakeadec");
}

#[test]
fn test_missing_file_is_error_when_named() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cool.toml");
    assert!(matches!(CoolConfig::from_file(&path), Err(Error::Io(_))));
    assert_eq!(
        CoolConfig::load_or_default(&path).unwrap(),
        CoolConfig::default()
    );
}

#[test]
fn test_invalid_config_rejected_by_init() {
    let file = write_config("[decode]\nout_size = 0\n");
    let config = CoolConfig::from_file(file.path()).unwrap();

    let registry = Arc::new(FactoryRegistry::new());
    let result = decproxy::plugin_init(&registry, &Bus::default(), &config);
    assert!(matches!(result, Err(Error::Config(_))));
    assert!(registry.list_factories().is_empty());
}

#[test]
fn test_malformed_file() {
    let file = write_config("[rank\nfakeadec = 1");
    assert!(matches!(
        CoolConfig::from_file(file.path()),
        Err(Error::Toml(_))
    ));
}
