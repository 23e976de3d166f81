/*!
 * Presentation host object-model contract.
 *
 * The translation core never edits a presentation directly. It consumes this
 * narrow contract instead: enumerate shapes, read text and formatting of
 * character ranges, and write text and formatting back. Every method is one
 * committed round trip; values become observable only once it returns.
 *
 * Implementations must tolerate partial support. An attribute the host cannot
 * read is reported as `None`, an attribute it cannot write is counted in
 * [`WriteReport::skipped_attributes`] rather than failing the whole write.
 */

use async_trait::async_trait;

use crate::errors::HostError;
use crate::model::{
    FontAttribute, FontProbe, FontSnapshot, ParagraphFormatSnapshot, Run, ShapeLocator, TextSpan,
};

pub mod memory;

pub use self::memory::MemoryDeck;

/// How much paragraph-level formatting the host exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParagraphFormatSupport {
    /// No paragraph formatting at all
    Unavailable,
    /// Alignment, indent level and bullet visibility
    Basic,
    /// Basic plus bullet type and bullet style
    ExtendedBullet,
}

/// Feature flags negotiated once per session
#[derive(Debug, Clone, PartialEq)]
pub struct HostCapabilities {
    pub paragraph_format: ParagraphFormatSupport,
    /// Font attributes the host can neither read nor write
    pub unsupported_font_attributes: Vec<FontAttribute>,
    pub tables: bool,
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self {
            paragraph_format: ParagraphFormatSupport::ExtendedBullet,
            unsupported_font_attributes: Vec::new(),
            tables: true,
        }
    }
}

impl HostCapabilities {
    /// Font attributes that can be read and written
    pub fn supported_font_attributes(&self) -> Vec<FontAttribute> {
        FontAttribute::ALL
            .iter()
            .copied()
            .filter(|a| !self.unsupported_font_attributes.contains(a))
            .collect()
    }

    pub fn supports_font_attribute(&self, attribute: FontAttribute) -> bool {
        !self.unsupported_font_attributes.contains(&attribute)
    }
}

/// Kind of a node in a slide's shape tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// Leaf shape with a text frame
    Text,
    /// Table with addressable cells
    Table { rows: usize, columns: usize },
    /// Group whose children are enumerated separately
    Group,
    /// Anything without text (pictures, lines, media)
    Other,
}

/// One node of a slide's shape tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeNode {
    pub id: String,
    pub name: String,
    pub kind: ShapeKind,
}

/// Paragraph attributes requested in one probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParagraphFields {
    pub alignment: bool,
    pub indent_level: bool,
    pub bullet_visible: bool,
    pub bullet_type: bool,
    pub bullet_style: bool,
}

impl ParagraphFields {
    pub const EXTENDED: ParagraphFields = ParagraphFields {
        alignment: true,
        indent_level: true,
        bullet_visible: true,
        bullet_type: true,
        bullet_style: true,
    };

    pub const BASIC: ParagraphFields = ParagraphFields {
        alignment: true,
        indent_level: true,
        bullet_visible: true,
        bullet_type: false,
        bullet_style: false,
    };

    const NONE: ParagraphFields = ParagraphFields {
        alignment: false,
        indent_level: false,
        bullet_visible: false,
        bullet_type: false,
        bullet_style: false,
    };

    /// Each requested field on its own, in a stable order
    pub fn singles(&self) -> Vec<ParagraphFields> {
        let mut singles = Vec::new();
        if self.alignment {
            singles.push(ParagraphFields { alignment: true, ..Self::NONE });
        }
        if self.indent_level {
            singles.push(ParagraphFields { indent_level: true, ..Self::NONE });
        }
        if self.bullet_visible {
            singles.push(ParagraphFields { bullet_visible: true, ..Self::NONE });
        }
        if self.bullet_type {
            singles.push(ParagraphFields { bullet_type: true, ..Self::NONE });
        }
        if self.bullet_style {
            singles.push(ParagraphFields { bullet_style: true, ..Self::NONE });
        }
        singles
    }

    /// Fields requested by `self` but not by `other`
    pub fn without(&self, other: ParagraphFields) -> ParagraphFields {
        ParagraphFields {
            alignment: self.alignment && !other.alignment,
            indent_level: self.indent_level && !other.indent_level,
            bullet_visible: self.bullet_visible && !other.bullet_visible,
            bullet_type: self.bullet_type && !other.bullet_type,
            bullet_style: self.bullet_style && !other.bullet_style,
        }
    }

    /// Whether `self` only asks for fields allowed by `support`
    pub fn fits(&self, support: ParagraphFormatSupport) -> bool {
        match support {
            ParagraphFormatSupport::Unavailable => self.singles().is_empty(),
            ParagraphFormatSupport::Basic => !self.bullet_type && !self.bullet_style,
            ParagraphFormatSupport::ExtendedBullet => true,
        }
    }
}

/// Content of one table cell as reported by the host
#[derive(Debug, Clone, PartialEq)]
pub struct TableCellContent {
    pub row: usize,
    pub column: usize,
    pub text: String,
    pub runs: Vec<Run>,
}

/// Text and formatting to write into one shape in a single round trip.
///
/// The host writes `text` first, then applies `paragraph_formats` and `fonts`
/// in order, each addressed by character range into the new text.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeEdit {
    pub text: String,
    pub paragraph_formats: Vec<(TextSpan, ParagraphFormatSnapshot)>,
    pub fonts: Vec<(TextSpan, FontSnapshot)>,
    /// When false the underline attribute is left as the text write produced it
    pub apply_underline: bool,
}

/// Replacement runs for one table cell
#[derive(Debug, Clone, PartialEq)]
pub struct CellEdit {
    pub row: usize,
    pub column: usize,
    pub runs: Vec<Run>,
}

/// Outcome of a write round trip
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub applied_attributes: usize,
    /// Attribute writes the host silently refused
    pub skipped_attributes: usize,
}

impl WriteReport {
    pub fn merge(&mut self, other: WriteReport) {
        self.applied_attributes += other.applied_attributes;
        self.skipped_attributes += other.skipped_attributes;
    }
}

/// Read/write contract of a presentation-editing host
#[async_trait]
pub trait PresentationHost: Send + Sync {
    /// Feature flags for this session
    async fn capabilities(&self) -> HostCapabilities;

    /// Number of slides in the presentation
    async fn slide_count(&self) -> Result<usize, HostError>;

    /// Top-level shapes of a slide
    async fn slide_shapes(&self, slide_index: usize) -> Result<Vec<ShapeNode>, HostError>;

    /// Children of the group addressed by `group_path` (outermost id first,
    /// the group itself last)
    async fn group_children(
        &self,
        slide_index: usize,
        group_path: &[String],
    ) -> Result<Vec<ShapeNode>, HostError>;

    /// Full text of a text shape
    async fn shape_text(&self, locator: &ShapeLocator) -> Result<String, HostError>;

    /// Font attributes of each span, batched into one round trip
    async fn probe_fonts(
        &self,
        locator: &ShapeLocator,
        spans: &[TextSpan],
    ) -> Result<Vec<FontProbe>, HostError>;

    /// Paragraph attributes of the paragraphs starting at each span.
    ///
    /// Fails as a whole when any requested field is unsupported.
    async fn probe_paragraph_formats(
        &self,
        locator: &ShapeLocator,
        spans: &[TextSpan],
        fields: ParagraphFields,
    ) -> Result<Vec<ParagraphFormatSnapshot>, HostError>;

    /// Every cell of a table shape, row-major
    async fn table_cells(&self, locator: &ShapeLocator) -> Result<Vec<TableCellContent>, HostError>;

    /// Replace a shape's text and reapply formatting
    async fn write_shape(&self, locator: &ShapeLocator, edit: ShapeEdit) -> Result<WriteReport, HostError>;

    /// Replace the runs of the given table cells
    async fn write_table_cells(
        &self,
        locator: &ShapeLocator,
        cells: Vec<CellEdit>,
    ) -> Result<WriteReport, HostError>;
}
