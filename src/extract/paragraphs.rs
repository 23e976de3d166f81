/*!
 * Paragraph extraction.
 *
 * Splits shape text into paragraphs, reads each paragraph's formatting through
 * a reader negotiated once per session, and reconstructs runs per paragraph.
 */

use log::{debug, warn};

use crate::errors::HostError;
use crate::extract::runs::{RunBoundaryDetector, RunDetectionConfig};
use crate::extract::walker::{ShapeWalker, VisitedShape};
use crate::host::{ParagraphFields, ParagraphFormatSupport, PresentationHost, ShapeKind};
use crate::model::{
    Paragraph, ParagraphFormatSnapshot, Run, ShapeLocator, ShapeTextTarget, SlideTargets,
    TableCellTarget, TextSpan,
};

/// One line-delimited slice of a shape's text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphSlice<'a> {
    pub index: usize,
    /// Character offset of the first character in the full text
    pub start: usize,
    pub text: &'a str,
}

impl ParagraphSlice<'_> {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Split text on `\n`, `\r` or `\r\n`, each counted as one boundary.
///
/// Always yields at least one slice; empty text is one empty paragraph.
pub fn split_paragraphs(text: &str) -> Vec<ParagraphSlice<'_>> {
    let mut slices = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut byte_start = 0;
    let mut char_start = 0;
    let mut char_pos = 0;

    while let Some((byte_pos, c)) = chars.next() {
        if c != '\n' && c != '\r' {
            char_pos += 1;
            continue;
        }
        slices.push(ParagraphSlice {
            index: slices.len(),
            start: char_start,
            text: &text[byte_start..byte_pos],
        });
        let mut separator_end = byte_pos + 1;
        char_pos += 1;
        if c == '\r' {
            if let Some((next_pos, '\n')) = chars.peek().copied() {
                chars.next();
                separator_end = next_pos + 1;
                char_pos += 1;
            }
        }
        byte_start = separator_end;
        char_start = char_pos;
    }

    slices.push(ParagraphSlice {
        index: slices.len(),
        start: char_start,
        text: &text[byte_start..],
    });
    slices
}

/// Paragraph-format reader picked from the host capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphFormatReader {
    /// The host exposes no paragraph formatting
    Unavailable,
    /// Alignment, indent level and bullet visibility
    Basic,
    /// Basic plus bullet type and style
    ExtendedBullet,
}

impl ParagraphFormatReader {
    /// Pick the richest reader the host claims to support
    pub fn negotiate(support: ParagraphFormatSupport) -> Self {
        match support {
            ParagraphFormatSupport::Unavailable => Self::Unavailable,
            ParagraphFormatSupport::Basic => Self::Basic,
            ParagraphFormatSupport::ExtendedBullet => Self::ExtendedBullet,
        }
    }

    fn fields(&self) -> Option<ParagraphFields> {
        match self {
            Self::Unavailable => None,
            Self::Basic => Some(ParagraphFields::BASIC),
            Self::ExtendedBullet => Some(ParagraphFields::EXTENDED),
        }
    }

    /// Read the format of each paragraph starting at `spans`.
    ///
    /// Degrades from the full field set to the basic set, then reads the
    /// remaining fields one by one. A paragraph gets `None` only when no
    /// field could be read.
    pub async fn read(
        &self,
        host: &dyn PresentationHost,
        locator: &ShapeLocator,
        spans: &[TextSpan],
    ) -> Vec<Option<ParagraphFormatSnapshot>> {
        let Some(fields) = self.fields() else {
            return vec![None; spans.len()];
        };

        let mut formats = vec![ParagraphFormatSnapshot::default(); spans.len()];
        let mut missing = fields;

        match probe(host, locator, spans, fields).await {
            Some(read) => return finish(read),
            None if fields != ParagraphFields::BASIC => {
                debug!("Full paragraph format read failed for {}, trying basic", locator.path_key());
                if let Some(read) = probe(host, locator, spans, ParagraphFields::BASIC).await {
                    formats = read;
                    missing = fields.without(ParagraphFields::BASIC);
                }
            }
            None => {}
        }

        for single in missing.singles() {
            if let Some(read) = probe(host, locator, spans, single).await {
                formats = formats.into_iter().zip(read).map(|(acc, one)| acc.or(one)).collect();
            }
        }

        finish(formats)
    }
}

async fn probe(
    host: &dyn PresentationHost,
    locator: &ShapeLocator,
    spans: &[TextSpan],
    fields: ParagraphFields,
) -> Option<Vec<ParagraphFormatSnapshot>> {
    match host.probe_paragraph_formats(locator, spans, fields).await {
        Ok(read) if read.len() == spans.len() => Some(read),
        Ok(read) => {
            debug!("Host returned {} paragraph formats for {} paragraphs", read.len(), spans.len());
            None
        }
        Err(e) => {
            debug!("Paragraph format probe {:?} failed: {}", fields, e);
            None
        }
    }
}

fn finish(formats: Vec<ParagraphFormatSnapshot>) -> Vec<Option<ParagraphFormatSnapshot>> {
    formats.into_iter().map(ParagraphFormatSnapshot::non_empty).collect()
}

/// Builds translation targets for shapes and table cells
#[derive(Debug, Clone)]
pub struct ParagraphExtractor {
    detector: RunBoundaryDetector,
    format_reader: ParagraphFormatReader,
    tables: bool,
}

impl ParagraphExtractor {
    /// Negotiate capabilities with the host once for the whole session
    pub async fn negotiate(host: &dyn PresentationHost, config: RunDetectionConfig) -> Self {
        let capabilities = host.capabilities().await;
        debug!("Negotiated host capabilities: {:?}", capabilities);
        Self {
            detector: RunBoundaryDetector::new(config, &capabilities),
            format_reader: ParagraphFormatReader::negotiate(capabilities.paragraph_format),
            tables: capabilities.tables,
        }
    }

    /// Extract every paragraph of a text shape
    pub async fn extract_shape(
        &self,
        host: &dyn PresentationHost,
        shape: &VisitedShape,
    ) -> Result<ShapeTextTarget, HostError> {
        let locator = &shape.locator;
        let text = host.shape_text(locator).await?;
        let slices = split_paragraphs(&text);

        let spans: Vec<TextSpan> = slices
            .iter()
            .map(|slice| TextSpan::new(slice.start, slice.char_count()))
            .collect();
        let formats = self.format_reader.read(host, locator, &spans).await;

        let mut paragraphs = Vec::with_capacity(slices.len());
        for (slice, paragraph_format) in slices.iter().zip(formats) {
            let runs = self.detector.detect(host, locator, slice.text, slice.start).await?;
            paragraphs.push(Paragraph {
                id: locator.paragraph_id(slice.index),
                original_char_count: slice.char_count(),
                runs,
                paragraph_format,
            });
        }

        Ok(ShapeTextTarget {
            locator: locator.clone(),
            name: shape.name.clone(),
            label: shape.label.clone(),
            paragraphs,
        })
    }

    /// Extract every cell of a table shape
    pub async fn extract_table(
        &self,
        host: &dyn PresentationHost,
        shape: &VisitedShape,
    ) -> Result<Vec<TableCellTarget>, HostError> {
        if !self.tables {
            return Err(HostError::Unsupported("tables".to_string()));
        }
        let locator = &shape.locator;
        let cells = host.table_cells(locator).await?;

        Ok(cells
            .into_iter()
            .map(|cell| {
                let runs = if !cell.runs.is_empty() {
                    cell.runs
                } else {
                    vec![Run::plain(cell.text)]
                };
                TableCellTarget {
                    locator: locator.clone(),
                    name: shape.name.clone(),
                    label: shape.label.clone(),
                    row: cell.row,
                    column: cell.column,
                    id: locator.cell_id(cell.row, cell.column),
                    runs,
                }
            })
            .collect())
    }

    /// Extract all targets of one slide.
    ///
    /// Failures of individual shapes are logged and the shape is skipped.
    pub async fn extract_slide(
        &self,
        host: &dyn PresentationHost,
        walker: &ShapeWalker,
        slide_index: usize,
    ) -> Result<SlideTargets, HostError> {
        let mut targets = SlideTargets::new(slide_index);

        for shape in walker.walk(host, slide_index).await? {
            match shape.kind {
                ShapeKind::Text => match self.extract_shape(host, &shape).await {
                    Ok(target) => targets.shapes.push(target),
                    Err(e) => warn!("Skipping shape '{}': {}", shape.label, e),
                },
                ShapeKind::Table { .. } => match self.extract_table(host, &shape).await {
                    Ok(cells) => targets.cells.extend(cells),
                    Err(e) => warn!("Skipping table '{}': {}", shape.label, e),
                },
                ShapeKind::Group | ShapeKind::Other => {}
            }
        }

        debug!(
            "Slide {}: {} text shapes, {} table cells",
            slide_index + 1,
            targets.shapes.len(),
            targets.cells.len()
        );
        Ok(targets)
    }
}
