/*!
 * Tests for deck file discovery and I/O
 */

use std::fs;

use slidelingo::file_utils::FileManager;
use slidelingo::host::PresentationHost;

use crate::common::{create_temp_dir, create_test_file, sample_deck};

#[test]
fn test_findDecks_shouldSkipTranslatedOutputsAndOtherFiles() {
    let dir = create_temp_dir().unwrap();
    let nested = dir.path().join("q3");
    fs::create_dir_all(&nested).unwrap();
    create_test_file(dir.path(), "intro.json", "{}").unwrap();
    create_test_file(dir.path(), "intro.fr.json", "{}").unwrap();
    create_test_file(dir.path(), "notes.txt", "hello").unwrap();
    create_test_file(&nested, "results.JSON", "{}").unwrap();

    let decks = FileManager::find_decks(dir.path()).unwrap();

    let names: Vec<String> = decks
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["intro.json", "results.JSON"]);
}

#[tokio::test]
async fn test_writeDeck_thenReadDeck_shouldPreserveContent() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("out").join("deck.json");
    let original = sample_deck();

    FileManager::write_deck(&path, &original).unwrap();
    let loaded = FileManager::read_deck(&path).unwrap();

    assert_eq!(loaded.snapshot(), original.snapshot());
    assert_eq!(loaded.slide_count().await.unwrap(), 2);
}

#[test]
fn test_readDeck_withInvalidJson_shouldFail() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), "broken.json", "[1, 2").unwrap();
    assert!(FileManager::read_deck(&path).is_err());
}

#[test]
fn test_ensureDir_shouldCreateNestedDirectories() {
    let dir = create_temp_dir().unwrap();
    let nested = dir.path().join("a").join("b");
    FileManager::ensure_dir(&nested).unwrap();
    assert!(FileManager::dir_exists(&nested));
}
