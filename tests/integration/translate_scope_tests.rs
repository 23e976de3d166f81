/*!
 * End-to-end translate scopes over the in-memory host
 */

use regex::Regex;

use slidelingo::app_config::{TranslationConfig, TranslationProvider};
use slidelingo::app_controller::{ScopeMode, ScopeStatus, SlideSelection, TranslateScope};
use slidelingo::errors::{AppError, HostError, TranslationError};
use slidelingo::extract::ShapeWalker;
use slidelingo::host::memory::DeckShape;
use slidelingo::host::HostCapabilities;
use slidelingo::model::{FontSnapshot, Run, UnderlineStyle};
use slidelingo::providers::mock::MockProvider;
use slidelingo::translation::{CancellationToken, ScopeOptions, TranslationService};

use crate::common::{cells_of, deck, mock_service, para, paragraphs_of, plain_para, red, sample_deck, texts_of};

fn options() -> ScopeOptions {
    ScopeOptions::new("en", "fr")
}

#[tokio::test]
async fn test_run_withSampleDeck_shouldTranslateAndKeepFormatting() {
    let host = sample_deck();
    let (service, mock) = mock_service();

    let report = TranslateScope::new(&host, &service, options())
        .run(SlideSelection::All, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.status, ScopeStatus::Completed);
    assert_eq!(report.slides_processed, 2);
    assert_eq!(report.paragraphs_translated, 6);
    assert_eq!(report.failed_chunks, 0);

    assert_eq!(
        paragraphs_of(&host, 0, "title")[0].runs,
        vec![Run::new("[fr] Quarterly ", FontSnapshot::bold()), Run::new("[fr] results", red())]
    );
    assert_eq!(
        texts_of(&host, 0, "body"),
        vec!["[fr] Growth of 42% [fr] this year", "", "[fr] Thank you"]
    );
    assert_eq!(paragraphs_of(&host, 0, "body")[0].runs[1], Run::new("42%", FontSnapshot::bold()));
    assert_eq!(texts_of(&host, 1, "note"), vec!["[fr] Thank you"]);
    assert_eq!(
        cells_of(&host, 1, "tbl"),
        vec![vec!["[fr] Region", "2024"], vec!["[fr] North", "(c)"]]
    );

    // "Thank you" on slide 2 comes from the cache
    assert_eq!(report.cache_hits, 1);
    assert_eq!(mock.request_count(), 2);
}

#[tokio::test]
async fn test_run_shouldNeverSendProtectedRuns() {
    let host = sample_deck();
    let (service, mock) = mock_service();

    TranslateScope::new(&host, &service, options())
        .run(SlideSelection::All, &CancellationToken::new())
        .await
        .unwrap();

    for request in mock.requests() {
        assert!(!request.user_prompt.contains("42%"));
        assert!(!request.user_prompt.contains("(c)"));
        assert!(!request.user_prompt.contains("2024"));
    }
}

#[tokio::test]
async fn test_run_withBoldRedNormal_shouldKeepThreeRuns() {
    let host = deck(vec![vec![DeckShape::text(
        "1",
        "Body",
        vec![para(vec![
            Run::new("Bold ", FontSnapshot::bold()),
            Run::new("Red", red()),
            Run::plain("Normal"),
        ])],
    )]]);
    let mock = MockProvider::working().with_transform(|_, text| text.to_uppercase());
    let service = TranslationService::with_mock(mock);

    TranslateScope::new(&host, &service, options())
        .run(SlideSelection::All, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        paragraphs_of(&host, 0, "1")[0].runs,
        vec![
            Run::new("BOLD ", FontSnapshot::bold()),
            Run::new("RED", red()),
            Run::plain("NORMAL"),
        ]
    );
}

#[tokio::test]
async fn test_run_withPlainSpaceRun_shouldKeepItUntouched() {
    let host = deck(vec![vec![DeckShape::text(
        "1",
        "Body",
        vec![para(vec![
            Run::new("Bold", FontSnapshot::bold()),
            Run::plain(" "),
            Run::new("Red", red()),
            Run::plain("Normal"),
        ])],
    )]]);
    let (service, mock) = mock_service();

    TranslateScope::new(&host, &service, options())
        .run(SlideSelection::All, &CancellationToken::new())
        .await
        .unwrap();

    let runs = &paragraphs_of(&host, 0, "1")[0].runs;
    assert_eq!(runs.len(), 4);
    assert_eq!(runs[1], Run::plain(" "));
    assert_eq!(runs[3], Run::plain("[fr] Normal"));
    let sent: Vec<String> = mock.requests().iter().map(|r| r.user_prompt.clone()).collect();
    assert!(sent.iter().all(|prompt| !prompt.contains("\"text\": \" \"")));
}

#[tokio::test]
async fn test_run_withoutLineBreaks_shouldJoinParagraphsWithSpace() {
    let build = || deck(vec![vec![DeckShape::text("1", "Body", vec![plain_para("Hello"), plain_para("World")])]]);
    let (service, _) = mock_service();

    let kept = build();
    TranslateScope::new(&kept, &service, options())
        .run(SlideSelection::All, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(texts_of(&kept, 0, "1"), vec!["[fr] Hello", "[fr] World"]);

    let collapsed = build();
    let mut options = options();
    options.keep_line_breaks = false;
    TranslateScope::new(&collapsed, &service, options)
        .run(SlideSelection::All, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(texts_of(&collapsed, 0, "1"), vec!["[fr] Hello [fr] World"]);
}

#[tokio::test]
async fn test_run_withBreaksInsideTranslation_shouldKeepParagraphStructure() {
    let build = || deck(vec![vec![DeckShape::text("1", "Body", vec![plain_para("Hello world"), plain_para("Bye")])]]);
    let mock = MockProvider::working().with_transform(|_, text| text.replace(' ', "\n"));
    let service = TranslationService::with_mock(mock);

    let collapsed = build();
    let mut collapsing = options();
    collapsing.keep_line_breaks = false;
    TranslateScope::new(&collapsed, &service, collapsing)
        .run(SlideSelection::All, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(texts_of(&collapsed, 0, "1"), vec!["Hello world Bye"]);

    let kept = build();
    TranslateScope::new(&kept, &service, options())
        .run(SlideSelection::All, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(texts_of(&kept, 0, "1"), vec!["Hello\u{000B}world", "Bye"]);
}

#[tokio::test]
async fn test_run_withLeadingAndTrailingWhitespace_shouldSpliceIt() {
    let host = deck(vec![vec![DeckShape::text("1", "Body", vec![plain_para("  Hello  ")])]]);
    let mock = MockProvider::working().with_transform(|_, _| "\n Bonjour \t".to_string());
    let service = TranslationService::with_mock(mock);

    TranslateScope::new(&host, &service, options())
        .run(SlideSelection::All, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(texts_of(&host, 0, "1"), vec!["  Bonjour  "]);
}

#[tokio::test]
async fn test_run_withoutUnderlineReapply_shouldDropUnderlineOfLaterRuns() {
    let underlined = FontSnapshot { underline: UnderlineStyle::Single, ..Default::default() };
    let build = || {
        deck(vec![vec![DeckShape::text(
            "1",
            "Body",
            vec![para(vec![Run::plain("Visit "), Run::new("our site", underlined.clone())])],
        )]])
    };
    let (service, _) = mock_service();

    let reapplied = build();
    TranslateScope::new(&reapplied, &service, options())
        .run(SlideSelection::All, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(paragraphs_of(&reapplied, 0, "1")[0].runs[1].font.underline, UnderlineStyle::Single);

    let skipped = build();
    let mut options = options();
    options.reapply_underline = false;
    TranslateScope::new(&skipped, &service, options)
        .run(SlideSelection::All, &CancellationToken::new())
        .await
        .unwrap();
    let runs = &paragraphs_of(&skipped, 0, "1")[0].runs;
    assert!(runs.iter().all(|run| run.font.underline == UnderlineStyle::None));
}

#[tokio::test]
async fn test_run_inPreviewMode_shouldLeaveDeckUnmodified() {
    let host = sample_deck();
    let before = host.snapshot();
    let (service, _) = mock_service();

    let report = TranslateScope::new(&host, &service, options())
        .with_mode(ScopeMode::Preview)
        .run(SlideSelection::All, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(host.snapshot(), before);
    assert_eq!(
        report.preview.as_deref(),
        Some("[fr] Quarterly [fr] results\n\n[fr] Growth of 42% [fr] this year\n\n[fr] Thank you")
    );
}

#[tokio::test]
async fn test_run_inPreviewMode_shouldShowMergedCellText() {
    let host = sample_deck();
    let (service, _) = mock_service();

    let report = TranslateScope::new(&host, &service, options())
        .with_mode(ScopeMode::Preview)
        .with_walker(ShapeWalker::new(Some(Regex::new("^Callouts$").unwrap())))
        .run(SlideSelection::Single(1), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.preview.as_deref(), Some("[fr] Region\n\n[fr] North"));
    assert_eq!(cells_of(&host, 1, "tbl")[0][0], "Region");
}

#[tokio::test]
async fn test_run_withMissingCredential_shouldFailBeforeExtraction() {
    let host = sample_deck();
    let before = host.snapshot();
    let mut config = TranslationConfig::default();
    config.provider = TranslationProvider::OpenAI;
    let service = TranslationService::new(config).unwrap();

    let result = TranslateScope::new(&host, &service, options())
        .run(SlideSelection::All, &CancellationToken::new())
        .await;

    assert!(matches!(
        result,
        Err(AppError::Translation(TranslationError::MissingCredential(_)))
    ));
    assert_eq!(host.font_round_trips(), 0);
    assert_eq!(host.snapshot(), before);
}

#[tokio::test]
async fn test_run_withCancelDuringFirstSlide_shouldKeepAppliedWorkAndStop() {
    let host = deck(vec![
        vec![DeckShape::text("a", "A", vec![plain_para("One"), plain_para("Two"), plain_para("Three")])],
        vec![DeckShape::text("b", "B", vec![plain_para("Four")])],
    ]);
    let cancel = CancellationToken::new();
    let hook_token = cancel.clone();
    let mock = MockProvider::working().with_request_hook(move |n| {
        if n == 0 {
            hook_token.cancel();
        }
    });
    let service = TranslationService::with_mock(mock.clone());
    let mut options = options();
    options.max_chunk_items = 1;
    options.concurrency = 1;

    let report = TranslateScope::new(&host, &service, options)
        .run(SlideSelection::All, &cancel)
        .await
        .unwrap();

    assert_eq!(report.status, ScopeStatus::Cancelled);
    assert_eq!(report.dispatched_chunks, 1);
    assert_eq!(mock.request_count(), 1);
    assert_eq!(texts_of(&host, 0, "a"), vec!["[fr] One", "Two", "Three"]);
    assert_eq!(texts_of(&host, 1, "b"), vec!["Four"]);
}

#[tokio::test]
async fn test_run_withCancelBetweenSlides_shouldSkipRemainingSlides() {
    let host = deck(vec![
        vec![DeckShape::text("a", "A", vec![plain_para("One")])],
        vec![DeckShape::text("b", "B", vec![plain_para("Two")])],
    ]);
    let cancel = CancellationToken::new();
    let hook_token = cancel.clone();
    let service = TranslationService::with_mock(MockProvider::working().with_request_hook(move |_| hook_token.cancel()));

    let report = TranslateScope::new(&host, &service, options())
        .run(SlideSelection::All, &cancel)
        .await
        .unwrap();

    assert!(report.is_cancelled());
    assert_eq!(report.slides_processed, 1);
    assert_eq!(texts_of(&host, 0, "a"), vec!["[fr] One"]);
    assert_eq!(texts_of(&host, 1, "b"), vec!["Two"]);
}

#[tokio::test]
async fn test_run_withFailingProvider_shouldLeaveTextUntouched() {
    let host = sample_deck();
    let before = host.snapshot();
    let service = TranslationService::with_mock(MockProvider::failing());

    let report = TranslateScope::new(&host, &service, options())
        .run(SlideSelection::All, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.status, ScopeStatus::Completed);
    assert_eq!(report.failed_chunks, 2);
    assert_eq!(report.paragraphs_translated, 0);
    assert_eq!(host.snapshot(), before);
}

#[tokio::test]
async fn test_run_withPartialAnswer_shouldKeepMissingRunsOriginal() {
    let host = deck(vec![vec![DeckShape::text(
        "1",
        "Body",
        vec![para(vec![Run::new("Hello ", FontSnapshot::bold()), Run::plain("world")])],
    )]]);
    let service = TranslationService::with_mock(MockProvider::partial());

    TranslateScope::new(&host, &service, options())
        .run(SlideSelection::All, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(texts_of(&host, 0, "1"), vec!["[fr] Hello world"]);
}

#[tokio::test]
async fn test_run_withExcludedGroup_shouldSkipItsSubtree() {
    let host = sample_deck();
    let (service, _) = mock_service();

    TranslateScope::new(&host, &service, options())
        .with_walker(ShapeWalker::new(Some(Regex::new("^Callouts$").unwrap())))
        .run(SlideSelection::Single(1), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(texts_of(&host, 1, "note"), vec!["Thank you"]);
    assert_eq!(cells_of(&host, 1, "tbl")[0][0], "[fr] Region");
}

#[tokio::test]
async fn test_run_withSingleSlide_shouldOnlyTouchThatSlide() {
    let host = sample_deck();
    let (service, _) = mock_service();

    let report = TranslateScope::new(&host, &service, options())
        .run(SlideSelection::Single(1), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.slides_processed, 1);
    assert_eq!(texts_of(&host, 0, "body")[2], "Thank you");
    assert_eq!(texts_of(&host, 1, "note"), vec!["[fr] Thank you"]);
}

#[tokio::test]
async fn test_run_withSlideOutOfRange_shouldFail() {
    let host = sample_deck();
    let (service, _) = mock_service();

    let result = TranslateScope::new(&host, &service, options())
        .run(SlideSelection::Single(5), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(AppError::Host(HostError::SlideNotFound(5)))));
}

#[tokio::test]
async fn test_run_withoutTableSupport_shouldStillTranslateText() {
    let host = sample_deck().with_capabilities(HostCapabilities { tables: false, ..Default::default() });
    let (service, _) = mock_service();

    let report = TranslateScope::new(&host, &service, options())
        .run(SlideSelection::Single(1), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.status, ScopeStatus::Completed);
    assert_eq!(texts_of(&host, 1, "note"), vec!["[fr] Thank you"]);
    assert_eq!(cells_of(&host, 1, "tbl")[0][0], "Region");
}
