/*!
 * Tests for configuration loading, persistence and validation
 */

use std::path::PathBuf;

use slidelingo::app_config::{resolve_config_path, Config, TranslationProvider};

use crate::common::{create_temp_dir, create_test_file};

#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("nested").join("conf.json");

    let config = Config::load_or_create(&path).unwrap();

    assert!(path.exists());
    assert_eq!(config.target_language, "fr");
    let reloaded = Config::load_or_create(&path).unwrap();
    assert_eq!(reloaded.deck.max_chunk_chars, 12_000);
    assert_eq!(reloaded.translation.provider, TranslationProvider::Ollama);
}

#[test]
fn test_loadOrCreate_withPartialFile_shouldKeepGivenValues() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(
        dir.path(),
        "conf.json",
        r#"{ "source_language": "auto", "target_language": "de", "deck": { "glossary": "Acme=Acme" } }"#,
    )
    .unwrap();

    let config = Config::load_or_create(&path).unwrap();

    assert_eq!(config.source_language, "auto");
    assert_eq!(config.target_language, "de");
    assert_eq!(config.deck.glossary, "Acme=Acme");
    assert!(config.deck.keep_line_breaks);
    assert!(config.validate().is_ok());
    assert_eq!(config.scope_options().glossary.get("Acme"), Some("Acme"));
}

#[test]
fn test_loadOrCreate_withInvalidJson_shouldFail() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), "conf.json", "{ not json").unwrap();
    assert!(Config::load_or_create(&path).is_err());
}

#[test]
fn test_save_thenLoad_shouldRoundTripProviderSettings() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Anthropic;
    config.translation.provider_config_mut(TranslationProvider::Anthropic).api_key = "sk-test".to_string();
    config.deck.fit_to_length = true;
    config.deck.fit_to_length_strength = 30;

    config.save(&path).unwrap();
    let loaded = Config::load_or_create(&path).unwrap();

    assert_eq!(loaded.translation.provider, TranslationProvider::Anthropic);
    assert_eq!(loaded.translation.get_api_key(), "sk-test");
    assert_eq!(loaded.scope_options().fit_to_length, Some(30));
    assert!(loaded.validate().is_ok());
}

#[test]
fn test_validate_withInvalidTargetLanguage_shouldFail() {
    let mut config = Config::default();
    config.target_language = "klingon".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withAutoTarget_shouldFail() {
    let mut config = Config::default();
    config.target_language = "auto".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withZeroChunkLimit_shouldFail() {
    let mut config = Config::default();
    config.deck.max_chunk_items = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_resolveConfigPath_withExplicitPath_shouldKeepIt() {
    assert_eq!(resolve_config_path("/tmp/other.json"), PathBuf::from("/tmp/other.json"));
}
