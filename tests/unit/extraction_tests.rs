/*!
 * Tests for run detection and paragraph extraction against the in-memory host
 */

use async_trait::async_trait;

use slidelingo::errors::HostError;
use slidelingo::extract::{ParagraphExtractor, RunBoundaryDetector, RunDetectionConfig, ShapeWalker};
use slidelingo::host::memory::DeckShape;
use slidelingo::host::{
    CellEdit, HostCapabilities, MemoryDeck, ParagraphFields, ParagraphFormatSupport, PresentationHost,
    ShapeEdit, ShapeNode, TableCellContent, WriteReport,
};
use slidelingo::model::{
    Alignment, BulletStyle, BulletType, FontProbe, FontSnapshot, ParagraphFormatSnapshot, Run, ShapeLocator,
    TextSpan,
};

use crate::common::{deck, para, plain_para, red};

fn detector(scan_threshold: usize) -> RunBoundaryDetector {
    RunBoundaryDetector::new(
        RunDetectionConfig { scan_threshold, ..Default::default() },
        &HostCapabilities::default(),
    )
}

fn mixed_runs() -> Vec<Run> {
    vec![
        Run::new("Revenue ", FontSnapshot::bold()),
        Run::plain("grew in every "),
        Run::new("region", red()),
        Run::plain(", led by "),
        Run::new("exports", FontSnapshot::italic()),
        Run::plain("."),
    ]
}

#[tokio::test]
async fn test_detect_withBothStrategies_shouldPartitionTextLosslessly() {
    let source = mixed_runs();
    let text: String = source.iter().map(|r| r.text.as_str()).collect();
    let locator = ShapeLocator::new(0, vec![], "body");

    for threshold in [1, 10_000] {
        let host = deck(vec![vec![DeckShape::text("body", "Body", vec![para(source.clone())])]]);
        let runs = detector(threshold).detect(&host, &locator, &text, 0).await.unwrap();

        let rebuilt: String = runs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(rebuilt, text);
        assert!(runs.windows(2).all(|pair| pair[0].font != pair[1].font));
        assert_eq!(runs, source);
    }
}

#[tokio::test]
async fn test_detect_onSecondParagraph_shouldUseShapeOffset() {
    let host = deck(vec![vec![DeckShape::text(
        "body",
        "Body",
        vec![plain_para("First line"), para(vec![Run::new("Bold", FontSnapshot::bold()), Run::plain(" tail")])],
    )]]);
    let locator = ShapeLocator::new(0, vec![], "body");

    let runs = detector(1500).detect(&host, &locator, "Bold tail", 11).await.unwrap();

    assert_eq!(runs, vec![Run::new("Bold", FontSnapshot::bold()), Run::plain(" tail")]);
}

#[tokio::test]
async fn test_bisect_withLongUniformParagraph_shouldUseOneRoundTrip() {
    let text = "word ".repeat(400);
    let host = deck(vec![vec![DeckShape::text("body", "Body", vec![plain_para(&text)])]]);
    let locator = ShapeLocator::new(0, vec![], "body");

    let runs = detector(1500).detect(&host, &locator, &text, 0).await.unwrap();

    assert_eq!(runs.len(), 1);
    assert_eq!(host.font_round_trips(), 1);
}

#[tokio::test]
async fn test_extractSlide_shouldBuildParagraphIdsAndCounts() {
    let host = deck(vec![vec![DeckShape::text(
        "body",
        "Body",
        vec![para(mixed_runs()), plain_para(""), plain_para("Done")],
    )]]);
    let extractor = ParagraphExtractor::negotiate(&host, RunDetectionConfig::default()).await;

    let targets = extractor.extract_slide(&host, &ShapeWalker::default(), 0).await.unwrap();

    let paragraphs = &targets.shapes[0].paragraphs;
    assert_eq!(paragraphs.len(), 3);
    assert_eq!(paragraphs[0].runs, mixed_runs());
    assert_eq!(paragraphs[0].original_char_count, paragraphs[0].text().chars().count());
    assert_eq!(paragraphs[1].runs, vec![Run::plain("")]);
    assert_ne!(paragraphs[0].id, paragraphs[2].id);
}

fn formatted_deck() -> MemoryDeck {
    deck(vec![vec![DeckShape::text(
        "list",
        "List",
        vec![plain_para("Point one").with_format(ParagraphFormatSnapshot {
            alignment: Some(Alignment::Center),
            indent_level: Some(1),
            bullet_visible: Some(true),
            bullet_type: Some(BulletType::Numbered),
            bullet_style: Some(BulletStyle::ArabicPeriod),
        })],
    )]])
}

async fn first_format(host: &dyn PresentationHost) -> Option<ParagraphFormatSnapshot> {
    let extractor = ParagraphExtractor::negotiate(host, RunDetectionConfig::default()).await;
    let targets = extractor.extract_slide(host, &ShapeWalker::default(), 0).await.unwrap();
    targets.shapes[0].paragraphs[0].paragraph_format.clone()
}

#[tokio::test]
async fn test_paragraphFormat_withExtendedHost_shouldReadEveryField() {
    let format = first_format(&formatted_deck()).await.unwrap();
    assert_eq!(format.bullet_style, Some(BulletStyle::ArabicPeriod));
    assert_eq!(format.alignment, Some(Alignment::Center));
}

#[tokio::test]
async fn test_paragraphFormat_withBasicHost_shouldOmitBulletDetails() {
    let host = formatted_deck().with_capabilities(HostCapabilities {
        paragraph_format: ParagraphFormatSupport::Basic,
        ..Default::default()
    });
    let format = first_format(&host).await.unwrap();

    assert_eq!(format.alignment, Some(Alignment::Center));
    assert_eq!(format.indent_level, Some(1));
    assert_eq!(format.bullet_visible, Some(true));
    assert_eq!(format.bullet_type, None);
    assert_eq!(format.bullet_style, None);
}

#[tokio::test]
async fn test_paragraphFormat_withUnavailableHost_shouldBeNone() {
    let host = formatted_deck().with_capabilities(HostCapabilities {
        paragraph_format: ParagraphFormatSupport::Unavailable,
        ..Default::default()
    });
    assert_eq!(first_format(&host).await, None);
}

/// Host that claims full paragraph support but refuses some fields
struct PickyHost {
    inner: MemoryDeck,
    refuse: fn(&ParagraphFields) -> bool,
}

#[async_trait]
impl PresentationHost for PickyHost {
    async fn capabilities(&self) -> HostCapabilities {
        self.inner.capabilities().await
    }

    async fn slide_count(&self) -> Result<usize, HostError> {
        self.inner.slide_count().await
    }

    async fn slide_shapes(&self, slide_index: usize) -> Result<Vec<ShapeNode>, HostError> {
        self.inner.slide_shapes(slide_index).await
    }

    async fn group_children(&self, slide_index: usize, group_path: &[String]) -> Result<Vec<ShapeNode>, HostError> {
        self.inner.group_children(slide_index, group_path).await
    }

    async fn shape_text(&self, locator: &ShapeLocator) -> Result<String, HostError> {
        self.inner.shape_text(locator).await
    }

    async fn probe_fonts(&self, locator: &ShapeLocator, spans: &[TextSpan]) -> Result<Vec<FontProbe>, HostError> {
        self.inner.probe_fonts(locator, spans).await
    }

    async fn probe_paragraph_formats(
        &self,
        locator: &ShapeLocator,
        spans: &[TextSpan],
        fields: ParagraphFields,
    ) -> Result<Vec<ParagraphFormatSnapshot>, HostError> {
        if (self.refuse)(&fields) {
            return Err(HostError::Unsupported(format!("{:?}", fields)));
        }
        self.inner.probe_paragraph_formats(locator, spans, fields).await
    }

    async fn table_cells(&self, locator: &ShapeLocator) -> Result<Vec<TableCellContent>, HostError> {
        self.inner.table_cells(locator).await
    }

    async fn write_shape(&self, locator: &ShapeLocator, edit: ShapeEdit) -> Result<WriteReport, HostError> {
        self.inner.write_shape(locator, edit).await
    }

    async fn write_table_cells(&self, locator: &ShapeLocator, cells: Vec<CellEdit>) -> Result<WriteReport, HostError> {
        self.inner.write_table_cells(locator, cells).await
    }
}

#[tokio::test]
async fn test_paragraphFormat_withRefusedBulletStyle_shouldKeepOtherFields() {
    let host = PickyHost { inner: formatted_deck(), refuse: |fields| fields.bullet_style };
    let format = first_format(&host).await.unwrap();

    assert_eq!(format.alignment, Some(Alignment::Center));
    assert_eq!(format.bullet_type, Some(BulletType::Numbered));
    assert_eq!(format.bullet_style, None);
}

#[tokio::test]
async fn test_paragraphFormat_withEveryFieldRefused_shouldBeNone() {
    let host = PickyHost { inner: formatted_deck(), refuse: |_| true };
    assert_eq!(first_format(&host).await, None);
}
