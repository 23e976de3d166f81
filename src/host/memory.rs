/*!
 * JSON-backed in-memory presentation.
 *
 * `MemoryDeck` implements the host contract over a serde model of a deck so
 * the CLI can translate deck files and tests can run the whole pipeline
 * without a real editor. Text shapes store styled runs per paragraph; the
 * host only exposes plain text plus per-range probes, exactly like a real
 * editor that hides its run structure.
 */

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::HostError;
use crate::model::{
    FontAttribute, FontProbe, FontSnapshot, ParagraphFormatSnapshot, Run, ShapeLocator, TextSpan,
};

use super::{
    CellEdit, HostCapabilities, ParagraphFields, ParagraphFormatSupport, PresentationHost,
    ShapeEdit, ShapeKind, ShapeNode, TableCellContent, WriteReport,
};

/// A whole presentation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    #[serde(default)]
    pub slides: Vec<DeckSlide>,
}

/// One slide and its shape tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeckSlide {
    #[serde(default)]
    pub shapes: Vec<DeckShape>,
}

/// A node of the shape tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DeckShape {
    Text {
        id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        paragraphs: Vec<DeckParagraph>,
    },
    Group {
        id: String,
        #[serde(default)]
        name: String,
        /// Locked groups refuse child enumeration
        #[serde(default, skip_serializing_if = "is_false")]
        locked: bool,
        #[serde(default)]
        children: Vec<DeckShape>,
    },
    Table {
        id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        rows: Vec<Vec<DeckCell>>,
    },
    Picture {
        id: String,
        #[serde(default)]
        name: String,
    },
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A paragraph of a text shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeckParagraph {
    #[serde(default)]
    pub runs: Vec<Run>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ParagraphFormatSnapshot>,
}

impl DeckParagraph {
    pub fn new(runs: Vec<Run>) -> Self {
        Self { runs, format: None }
    }

    pub fn with_format(mut self, format: ParagraphFormatSnapshot) -> Self {
        self.format = Some(format);
        self
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// A table cell
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeckCell {
    #[serde(default)]
    pub runs: Vec<Run>,
}

impl DeckCell {
    pub fn new(runs: Vec<Run>) -> Self {
        Self { runs }
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

impl DeckShape {
    /// Text shape built from paragraphs
    pub fn text(id: &str, name: &str, paragraphs: Vec<DeckParagraph>) -> Self {
        Self::Text { id: id.to_string(), name: name.to_string(), paragraphs }
    }

    /// Group shape built from children
    pub fn group(id: &str, name: &str, children: Vec<DeckShape>) -> Self {
        Self::Group { id: id.to_string(), name: name.to_string(), locked: false, children }
    }

    /// Table shape built from rows of cells
    pub fn table(id: &str, name: &str, rows: Vec<Vec<DeckCell>>) -> Self {
        Self::Table { id: id.to_string(), name: name.to_string(), rows }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Text { id, .. } | Self::Group { id, .. } | Self::Table { id, .. } | Self::Picture { id, .. } => id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Text { name, .. }
            | Self::Group { name, .. }
            | Self::Table { name, .. }
            | Self::Picture { name, .. } => name,
        }
    }

    fn node(&self) -> ShapeNode {
        let kind = match self {
            Self::Text { .. } => ShapeKind::Text,
            Self::Group { .. } => ShapeKind::Group,
            Self::Table { rows, .. } => ShapeKind::Table {
                rows: rows.len(),
                columns: rows.iter().map(Vec::len).max().unwrap_or(0),
            },
            Self::Picture { .. } => ShapeKind::Other,
        };
        ShapeNode { id: self.id().to_string(), name: self.name().to_string(), kind }
    }
}

/// Text of a shape flattened to characters with their fonts
struct FlatText {
    chars: Vec<(char, FontSnapshot)>,
    paragraph_starts: Vec<usize>,
    formats: Vec<Option<ParagraphFormatSnapshot>>,
}

impl FlatText {
    fn from_paragraphs(paragraphs: &[DeckParagraph]) -> Self {
        let mut chars: Vec<(char, FontSnapshot)> = Vec::new();
        let mut paragraph_starts = Vec::with_capacity(paragraphs.len());
        let mut formats = Vec::with_capacity(paragraphs.len());

        for (index, paragraph) in paragraphs.iter().enumerate() {
            if index > 0 {
                let separator_font = chars.last().map(|(_, f)| f.clone()).unwrap_or_default();
                chars.push(('\n', separator_font));
            }
            paragraph_starts.push(chars.len());
            formats.push(paragraph.format.clone());
            for run in &paragraph.runs {
                chars.extend(run.text.chars().map(|c| (c, run.font.clone())));
            }
        }

        Self { chars, paragraph_starts, formats }
    }

    fn text(&self) -> String {
        self.chars.iter().map(|(c, _)| *c).collect()
    }

    fn check_span(&self, span: &TextSpan) -> Result<(), HostError> {
        if span.end() > self.chars.len() {
            return Err(HostError::InvalidRange {
                start: span.start,
                length: span.length,
                text_length: self.chars.len(),
            });
        }
        Ok(())
    }

    /// Index of the paragraph containing character `offset`
    fn paragraph_at(&self, offset: usize) -> usize {
        self.paragraph_starts
            .iter()
            .rposition(|start| *start <= offset)
            .unwrap_or(0)
    }
}

fn common<T: PartialEq + Clone>(fonts: &[&FontSnapshot], get: impl Fn(&FontSnapshot) -> T) -> Option<T> {
    let first = get(fonts.first()?);
    if fonts.iter().all(|f| get(f) == first) {
        Some(first)
    } else {
        None
    }
}

/// Group consecutive characters sharing a font into runs
fn runs_from_chars(chars: &[(char, FontSnapshot)]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for (c, font) in chars {
        if let Some(run) = runs.last_mut().filter(|r| r.font == *font) {
            run.text.push(*c);
            continue;
        }
        runs.push(Run::new(c.to_string(), font.clone()));
    }
    runs
}

fn find_children<'a>(shapes: &'a [DeckShape], group_path: &[String]) -> Result<&'a [DeckShape], HostError> {
    let mut current = shapes;
    for group_id in group_path {
        current = match current.iter().find(|s| s.id() == group_id.as_str()) {
            Some(DeckShape::Group { children, .. }) => children,
            _ => return Err(HostError::ShapeNotFound(group_id.clone())),
        };
    }
    Ok(current)
}

fn find_children_mut<'a>(
    shapes: &'a mut [DeckShape],
    group_path: &[String],
) -> Result<&'a mut [DeckShape], HostError> {
    let mut current = shapes;
    for group_id in group_path {
        let siblings = current;
        current = match siblings.iter_mut().find(|s| s.id() == group_id.as_str()) {
            Some(DeckShape::Group { children, .. }) => children,
            _ => return Err(HostError::ShapeNotFound(group_id.clone())),
        };
    }
    Ok(current)
}

/// In-memory deck implementing [`PresentationHost`]
#[derive(Debug)]
pub struct MemoryDeck {
    deck: RwLock<Deck>,
    capabilities: HostCapabilities,
    font_round_trips: AtomicUsize,
}

impl MemoryDeck {
    /// Create a host over the given deck with full capabilities
    pub fn new(deck: Deck) -> Self {
        Self {
            deck: RwLock::new(deck),
            capabilities: HostCapabilities::default(),
            font_round_trips: AtomicUsize::new(0),
        }
    }

    /// Restrict the capabilities reported to callers
    pub fn with_capabilities(mut self, capabilities: HostCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Parse a deck from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Serialize the current deck state to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&*self.deck.read())
    }

    /// Copy of the current deck state
    pub fn snapshot(&self) -> Deck {
        self.deck.read().clone()
    }

    /// Number of font probe round trips served so far
    pub fn font_round_trips(&self) -> usize {
        self.font_round_trips.load(Ordering::SeqCst)
    }

    fn with_shape<T>(
        &self,
        locator: &ShapeLocator,
        f: impl FnOnce(&DeckShape) -> Result<T, HostError>,
    ) -> Result<T, HostError> {
        let deck = self.deck.read();
        let slide = deck
            .slides
            .get(locator.slide_index)
            .ok_or(HostError::SlideNotFound(locator.slide_index))?;
        let siblings = find_children(&slide.shapes, &locator.group_path)?;
        let shape = siblings
            .iter()
            .find(|s| s.id() == locator.shape_id)
            .ok_or_else(|| HostError::ShapeNotFound(locator.path_key()))?;
        f(shape)
    }

    fn with_shape_mut<T>(
        &self,
        locator: &ShapeLocator,
        f: impl FnOnce(&mut DeckShape) -> Result<T, HostError>,
    ) -> Result<T, HostError> {
        let mut deck = self.deck.write();
        let slide = deck
            .slides
            .get_mut(locator.slide_index)
            .ok_or(HostError::SlideNotFound(locator.slide_index))?;
        let siblings = find_children_mut(&mut slide.shapes, &locator.group_path)?;
        let shape = siblings
            .iter_mut()
            .find(|s| s.id() == locator.shape_id)
            .ok_or_else(|| HostError::ShapeNotFound(locator.path_key()))?;
        f(shape)
    }

    fn flat_text(&self, locator: &ShapeLocator) -> Result<FlatText, HostError> {
        self.with_shape(locator, |shape| match shape {
            DeckShape::Text { paragraphs, .. } => Ok(FlatText::from_paragraphs(paragraphs)),
            _ => Err(HostError::Unsupported(format!("shape {} has no text frame", shape.id()))),
        })
    }

    fn probe_span(&self, flat: &FlatText, span: &TextSpan) -> FontProbe {
        let fonts: Vec<&FontSnapshot> = if span.length == 0 {
            flat.chars.get(span.start).map(|(_, f)| f).into_iter().collect()
        } else {
            flat.chars[span.start..span.end()].iter().map(|(_, f)| f).collect()
        };
        if fonts.is_empty() {
            return FontProbe::uniform(&FontSnapshot::default());
        }

        let caps = &self.capabilities;
        let keep = |attribute: FontAttribute| caps.supports_font_attribute(attribute);
        FontProbe {
            all_caps: common(&fonts, |f| f.all_caps).filter(|_| keep(FontAttribute::AllCaps)),
            bold: common(&fonts, |f| f.bold).filter(|_| keep(FontAttribute::Bold)),
            italic: common(&fonts, |f| f.italic).filter(|_| keep(FontAttribute::Italic)),
            strikethrough: common(&fonts, |f| f.strikethrough).filter(|_| keep(FontAttribute::Strikethrough)),
            double_strikethrough: common(&fonts, |f| f.double_strikethrough)
                .filter(|_| keep(FontAttribute::DoubleStrikethrough)),
            subscript: common(&fonts, |f| f.subscript).filter(|_| keep(FontAttribute::Subscript)),
            superscript: common(&fonts, |f| f.superscript).filter(|_| keep(FontAttribute::Superscript)),
            small_caps: common(&fonts, |f| f.small_caps).filter(|_| keep(FontAttribute::SmallCaps)),
            color: common(&fonts, |f| f.color.clone()).filter(|_| keep(FontAttribute::Color)),
            name: common(&fonts, |f| f.name.clone()).filter(|_| keep(FontAttribute::Name)),
            size: common(&fonts, |f| f.size).filter(|_| keep(FontAttribute::Size)),
            underline: common(&fonts, |f| f.underline).filter(|_| keep(FontAttribute::Underline)),
        }
    }

    /// Copy the supported attributes of `source` onto `target`
    fn apply_font(&self, target: &mut FontSnapshot, source: &FontSnapshot, apply_underline: bool) {
        let caps = &self.capabilities;
        for attribute in caps.supported_font_attributes() {
            match attribute {
                FontAttribute::AllCaps => target.all_caps = source.all_caps,
                FontAttribute::Bold => target.bold = source.bold,
                FontAttribute::Italic => target.italic = source.italic,
                FontAttribute::Strikethrough => target.strikethrough = source.strikethrough,
                FontAttribute::DoubleStrikethrough => target.double_strikethrough = source.double_strikethrough,
                FontAttribute::Subscript => target.subscript = source.subscript,
                FontAttribute::Superscript => target.superscript = source.superscript,
                FontAttribute::SmallCaps => target.small_caps = source.small_caps,
                FontAttribute::Color => target.color = source.color.clone(),
                FontAttribute::Name => target.name = source.name.clone(),
                FontAttribute::Size => target.size = source.size,
                FontAttribute::Underline if apply_underline => target.underline = source.underline,
                FontAttribute::Underline => {}
            }
        }
    }

    /// Keep only the paragraph fields this host can write
    fn writable_format(&self, format: &ParagraphFormatSnapshot) -> (ParagraphFormatSnapshot, usize) {
        let fields = match self.capabilities.paragraph_format {
            ParagraphFormatSupport::Unavailable => return (ParagraphFormatSnapshot::default(), count_fields(format)),
            ParagraphFormatSupport::Basic => ParagraphFields::BASIC,
            ParagraphFormatSupport::ExtendedBullet => ParagraphFields::EXTENDED,
        };
        let kept = select_fields(format, fields);
        let skipped = count_fields(format) - count_fields(&kept);
        (kept, skipped)
    }
}

fn count_fields(format: &ParagraphFormatSnapshot) -> usize {
    [
        format.alignment.is_some(),
        format.indent_level.is_some(),
        format.bullet_visible.is_some(),
        format.bullet_type.is_some(),
        format.bullet_style.is_some(),
    ]
    .iter()
    .filter(|present| **present)
    .count()
}

fn select_fields(format: &ParagraphFormatSnapshot, fields: ParagraphFields) -> ParagraphFormatSnapshot {
    ParagraphFormatSnapshot {
        alignment: format.alignment.filter(|_| fields.alignment),
        indent_level: format.indent_level.filter(|_| fields.indent_level),
        bullet_visible: format.bullet_visible.filter(|_| fields.bullet_visible),
        bullet_type: format.bullet_type.filter(|_| fields.bullet_type),
        bullet_style: format.bullet_style.filter(|_| fields.bullet_style),
    }
}

#[async_trait]
impl PresentationHost for MemoryDeck {
    async fn capabilities(&self) -> HostCapabilities {
        self.capabilities.clone()
    }

    async fn slide_count(&self) -> Result<usize, HostError> {
        Ok(self.deck.read().slides.len())
    }

    async fn slide_shapes(&self, slide_index: usize) -> Result<Vec<ShapeNode>, HostError> {
        let deck = self.deck.read();
        let slide = deck
            .slides
            .get(slide_index)
            .ok_or(HostError::SlideNotFound(slide_index))?;
        Ok(slide.shapes.iter().map(DeckShape::node).collect())
    }

    async fn group_children(
        &self,
        slide_index: usize,
        group_path: &[String],
    ) -> Result<Vec<ShapeNode>, HostError> {
        let deck = self.deck.read();
        let slide = deck
            .slides
            .get(slide_index)
            .ok_or(HostError::SlideNotFound(slide_index))?;
        let Some((group_id, ancestors)) = group_path.split_last() else {
            return Ok(slide.shapes.iter().map(DeckShape::node).collect());
        };
        let siblings = find_children(&slide.shapes, ancestors)?;
        match siblings.iter().find(|s| s.id() == group_id.as_str()) {
            Some(DeckShape::Group { locked: true, name, .. }) => Err(HostError::Enumeration(name.clone())),
            Some(DeckShape::Group { children, .. }) => Ok(children.iter().map(DeckShape::node).collect()),
            _ => Err(HostError::ShapeNotFound(group_id.clone())),
        }
    }

    async fn shape_text(&self, locator: &ShapeLocator) -> Result<String, HostError> {
        Ok(self.flat_text(locator)?.text())
    }

    async fn probe_fonts(
        &self,
        locator: &ShapeLocator,
        spans: &[TextSpan],
    ) -> Result<Vec<FontProbe>, HostError> {
        self.font_round_trips.fetch_add(1, Ordering::SeqCst);
        let flat = self.flat_text(locator)?;
        spans
            .iter()
            .map(|span| {
                flat.check_span(span)?;
                Ok(self.probe_span(&flat, span))
            })
            .collect()
    }

    async fn probe_paragraph_formats(
        &self,
        locator: &ShapeLocator,
        spans: &[TextSpan],
        fields: ParagraphFields,
    ) -> Result<Vec<ParagraphFormatSnapshot>, HostError> {
        if !fields.fits(self.capabilities.paragraph_format) {
            return Err(HostError::Unsupported(format!(
                "paragraph fields {:?} exceed {:?}",
                fields, self.capabilities.paragraph_format
            )));
        }
        let flat = self.flat_text(locator)?;
        spans
            .iter()
            .map(|span| {
                flat.check_span(span)?;
                let paragraph = flat.paragraph_at(span.start);
                let stored = flat.formats.get(paragraph).cloned().flatten().unwrap_or_default();
                Ok(select_fields(&stored, fields))
            })
            .collect()
    }

    async fn table_cells(&self, locator: &ShapeLocator) -> Result<Vec<TableCellContent>, HostError> {
        if !self.capabilities.tables {
            return Err(HostError::Unsupported("tables".to_string()));
        }
        self.with_shape(locator, |shape| match shape {
            DeckShape::Table { rows, .. } => Ok(rows
                .iter()
                .enumerate()
                .flat_map(|(row, cells)| {
                    cells.iter().enumerate().map(move |(column, cell)| TableCellContent {
                        row,
                        column,
                        text: cell.text(),
                        runs: cell.runs.clone(),
                    })
                })
                .collect()),
            _ => Err(HostError::Unsupported(format!("shape {} is not a table", shape.id()))),
        })
    }

    async fn write_shape(&self, locator: &ShapeLocator, edit: ShapeEdit) -> Result<WriteReport, HostError> {
        let previous = self.flat_text(locator)?;
        let base_font = previous.chars.first().map(|(_, f)| f.clone()).unwrap_or_default();

        let mut chars: Vec<(char, FontSnapshot)> = edit.text.chars().map(|c| (c, base_font.clone())).collect();
        let mut report = WriteReport::default();
        let supported = self.capabilities.supported_font_attributes().len();
        let underline_skipped = usize::from(!edit.apply_underline && self.capabilities.supports_font_attribute(FontAttribute::Underline));

        for (span, font) in &edit.fonts {
            if span.end() > chars.len() {
                return Err(HostError::InvalidRange { start: span.start, length: span.length, text_length: chars.len() });
            }
            for (_, target) in &mut chars[span.start..span.end()] {
                self.apply_font(target, font, edit.apply_underline);
            }
            report.applied_attributes += supported - underline_skipped;
            report.skipped_attributes += FontAttribute::ALL.len() - supported;
        }

        // Split the new text back into paragraphs
        let mut paragraphs: Vec<(usize, Vec<(char, FontSnapshot)>)> = vec![(0, Vec::new())];
        for (offset, (c, font)) in chars.into_iter().enumerate() {
            if c == '\n' {
                paragraphs.push((offset + 1, Vec::new()));
            } else if let Some((_, current)) = paragraphs.last_mut() {
                current.push((c, font));
            }
        }

        let mut formats: Vec<Option<ParagraphFormatSnapshot>> = vec![None; paragraphs.len()];
        for (span, format) in &edit.paragraph_formats {
            let (writable, skipped) = self.writable_format(format);
            report.skipped_attributes += skipped;
            report.applied_attributes += count_fields(&writable);
            for (index, (start, _)) in paragraphs.iter().enumerate() {
                let covered = *start >= span.start && (*start < span.end() || (span.length == 0 && *start == span.start));
                if covered {
                    formats[index] = writable.clone().non_empty();
                }
            }
        }

        let rebuilt: Vec<DeckParagraph> = paragraphs
            .into_iter()
            .zip(formats)
            .map(|((_, chars), format)| DeckParagraph { runs: runs_from_chars(&chars), format })
            .collect();

        self.with_shape_mut(locator, |shape| match shape {
            DeckShape::Text { paragraphs, .. } => {
                *paragraphs = rebuilt;
                Ok(())
            }
            _ => Err(HostError::Unsupported(format!("shape {} has no text frame", locator.shape_id))),
        })?;

        Ok(report)
    }

    async fn write_table_cells(
        &self,
        locator: &ShapeLocator,
        cells: Vec<CellEdit>,
    ) -> Result<WriteReport, HostError> {
        if !self.capabilities.tables {
            return Err(HostError::Unsupported("tables".to_string()));
        }
        self.with_shape_mut(locator, |shape| match shape {
            DeckShape::Table { rows, .. } => {
                let mut report = WriteReport::default();
                for edit in cells {
                    let cell = rows
                        .get_mut(edit.row)
                        .and_then(|r| r.get_mut(edit.column))
                        .ok_or_else(|| HostError::CellNotFound {
                            shape: locator.path_key(),
                            row: edit.row,
                            column: edit.column,
                        })?;
                    cell.runs = edit.runs;
                    report.applied_attributes += 1;
                }
                Ok(report)
            }
            _ => Err(HostError::Unsupported(format!("shape {} is not a table", locator.shape_id))),
        })
    }
}
