/*!
 * Tests for the file-level controller
 */

use std::fs;

use slidelingo::app_config::Config;
use slidelingo::app_controller::{Controller, RunOptions, ScopeMode};
use slidelingo::file_utils::FileManager;
use slidelingo::providers::mock::MockProvider;
use slidelingo::translation::{CancellationToken, TranslationService};

use crate::common::{create_temp_dir, init_test_logging, sample_deck, texts_of};

fn controller() -> (Controller, MockProvider) {
    init_test_logging();
    let mock = MockProvider::working();
    let controller = Controller::with_service(Config::default(), TranslationService::with_mock(mock.clone()));
    (controller, mock)
}

#[tokio::test]
async fn test_run_withDeckFile_shouldWriteTranslatedCopy() {
    let dir = create_temp_dir().unwrap();
    let input = dir.path().join("deck.json");
    FileManager::write_deck(&input, &sample_deck()).unwrap();
    let (controller, _) = controller();

    let report = controller
        .run(input.clone(), dir.path().to_path_buf(), RunOptions::default(), &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.slides_processed, 2);
    let output = FileManager::read_deck(&dir.path().join("deck.fr.json")).unwrap();
    assert_eq!(texts_of(&output, 1, "note"), vec!["[fr] Thank you"]);
    let untouched = FileManager::read_deck(&input).unwrap();
    assert_eq!(untouched.snapshot(), sample_deck().snapshot());
}

#[tokio::test]
async fn test_run_withExistingOutput_shouldSkipUnlessForced() {
    let dir = create_temp_dir().unwrap();
    let input = dir.path().join("deck.json");
    FileManager::write_deck(&input, &sample_deck()).unwrap();
    let existing = dir.path().join("deck.fr.json");
    fs::write(&existing, "keep me").unwrap();
    let (controller, mock) = controller();

    let skipped = controller
        .run(input.clone(), dir.path().to_path_buf(), RunOptions::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(skipped.is_none());
    assert_eq!(mock.request_count(), 0);
    assert_eq!(fs::read_to_string(&existing).unwrap(), "keep me");

    let options = RunOptions { force_overwrite: true, ..RunOptions::default() };
    let forced = controller
        .run(input, dir.path().to_path_buf(), options, &CancellationToken::new())
        .await
        .unwrap();
    assert!(forced.is_some());
    assert!(FileManager::read_deck(&existing).is_ok());
}

#[tokio::test]
async fn test_run_inPreviewMode_shouldNotWriteOutput() {
    let dir = create_temp_dir().unwrap();
    let input = dir.path().join("deck.json");
    FileManager::write_deck(&input, &sample_deck()).unwrap();
    let (controller, _) = controller();
    let options = RunOptions { mode: ScopeMode::Preview, ..RunOptions::default() };

    let report = controller
        .run(input, dir.path().to_path_buf(), options, &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert!(report.preview.is_some());
    assert!(!dir.path().join("deck.fr.json").exists());
}

#[tokio::test]
async fn test_run_withMissingInput_shouldFail() {
    let dir = create_temp_dir().unwrap();
    let (controller, _) = controller();

    let result = controller
        .run(dir.path().join("absent.json"), dir.path().to_path_buf(), RunOptions::default(), &CancellationToken::new())
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_runFolder_shouldTranslateEveryDeckAndSurviveBrokenFiles() {
    let dir = create_temp_dir().unwrap();
    let nested = dir.path().join("q3");
    FileManager::write_deck(&dir.path().join("intro.json"), &sample_deck()).unwrap();
    FileManager::write_deck(&nested.join("results.json"), &sample_deck()).unwrap();
    fs::write(dir.path().join("broken.json"), "[1, 2").unwrap();
    let (controller, _) = controller();

    controller
        .run_folder(dir.path().to_path_buf(), None, RunOptions::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(dir.path().join("intro.fr.json").exists());
    assert!(nested.join("results.fr.json").exists());
    assert!(!dir.path().join("broken.fr.json").exists());
}

#[tokio::test]
async fn test_runFolder_withCancelledToken_shouldWriteNothing() {
    let dir = create_temp_dir().unwrap();
    FileManager::write_deck(&dir.path().join("intro.json"), &sample_deck()).unwrap();
    let (controller, mock) = controller();
    let cancel = CancellationToken::new();
    cancel.cancel();

    controller
        .run_folder(dir.path().to_path_buf(), None, RunOptions::default(), &cancel)
        .await
        .unwrap();

    assert_eq!(mock.request_count(), 0);
    assert!(!dir.path().join("intro.fr.json").exists());
}

#[tokio::test]
async fn test_runFolder_withMissingDirectory_shouldFail() {
    let dir = create_temp_dir().unwrap();
    let (controller, _) = controller();

    let result = controller
        .run_folder(dir.path().join("nope"), None, RunOptions::default(), &CancellationToken::new())
        .await;

    assert!(result.is_err());
}

#[test]
fn test_testConnection_withOfflineProvider_shouldFail() {
    let controller = Controller::with_service(Config::default(), TranslationService::with_mock(MockProvider::failing()));

    let result = tokio_test::block_on(async { controller.test_connection().await });

    assert!(result.is_err());
    assert_eq!(controller.usage().requests, 0);
}
