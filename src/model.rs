/*!
 * Formatting snapshots and the extracted text model.
 *
 * Every value crossing the host boundary is converted into one of the closed
 * types defined here as soon as it is read. Downstream code (translation,
 * recomposition) never sees untyped host values.
 */

use serde::{Deserialize, Serialize};

/// Default typeface used when the host cannot report one
pub const DEFAULT_FONT_NAME: &str = "Calibri";

/// Default font size in points
pub const DEFAULT_FONT_SIZE: f32 = 12.0;

/// Default text color
pub const DEFAULT_FONT_COLOR: &str = "#000000";

/// Underline style of a text range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum UnderlineStyle {
    #[default]
    None,
    Single,
    Double,
    Heavy,
    Dotted,
    Dashed,
    Wavy,
}

/// Horizontal paragraph alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
    Distributed,
}

/// Kind of bullet attached to a paragraph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BulletType {
    None,
    Unnumbered,
    Numbered,
}

/// Visual style of a bullet or numbering scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BulletStyle {
    Disc,
    Circle,
    Square,
    Dash,
    Arrow,
    Checkmark,
    ArabicPeriod,
    ArabicParenRight,
    RomanUpperPeriod,
    RomanLowerPeriod,
    AlphaUpperPeriod,
    AlphaLowerPeriod,
}

/// Every visual font attribute needed to reproduce the styling of a run.
///
/// Two snapshots are equal iff every field matches; run merging relies on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FontSnapshot {
    pub all_caps: bool,
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub double_strikethrough: bool,
    pub subscript: bool,
    pub superscript: bool,
    pub small_caps: bool,
    pub color: String,
    pub name: String,
    pub size: f32,
    pub underline: UnderlineStyle,
}

impl Default for FontSnapshot {
    fn default() -> Self {
        Self {
            all_caps: false,
            bold: false,
            italic: false,
            strikethrough: false,
            double_strikethrough: false,
            subscript: false,
            superscript: false,
            small_caps: false,
            color: DEFAULT_FONT_COLOR.to_string(),
            name: DEFAULT_FONT_NAME.to_string(),
            size: DEFAULT_FONT_SIZE,
            underline: UnderlineStyle::None,
        }
    }
}

impl FontSnapshot {
    /// Bold variant of the default font
    pub fn bold() -> Self {
        Self { bold: true, ..Default::default() }
    }

    /// Italic variant of the default font
    pub fn italic() -> Self {
        Self { italic: true, ..Default::default() }
    }

    /// Default font in the given color
    pub fn colored(color: &str) -> Self {
        Self { color: color.to_string(), ..Default::default() }
    }
}

/// Font attributes the host may or may not be able to report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontAttribute {
    AllCaps,
    Bold,
    Italic,
    Strikethrough,
    DoubleStrikethrough,
    Subscript,
    Superscript,
    SmallCaps,
    Color,
    Name,
    Size,
    Underline,
}

impl FontAttribute {
    pub const ALL: [FontAttribute; 12] = [
        FontAttribute::AllCaps,
        FontAttribute::Bold,
        FontAttribute::Italic,
        FontAttribute::Strikethrough,
        FontAttribute::DoubleStrikethrough,
        FontAttribute::Subscript,
        FontAttribute::Superscript,
        FontAttribute::SmallCaps,
        FontAttribute::Color,
        FontAttribute::Name,
        FontAttribute::Size,
        FontAttribute::Underline,
    ];
}

/// Font attributes of a probed range as reported by the host.
///
/// `None` means the attribute is ambiguous over the range (mixed formatting)
/// or could not be read at all. The two cases are indistinguishable from a
/// single probe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontProbe {
    pub all_caps: Option<bool>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub strikethrough: Option<bool>,
    pub double_strikethrough: Option<bool>,
    pub subscript: Option<bool>,
    pub superscript: Option<bool>,
    pub small_caps: Option<bool>,
    pub color: Option<String>,
    pub name: Option<String>,
    pub size: Option<f32>,
    pub underline: Option<UnderlineStyle>,
}

impl FontProbe {
    /// Probe where every attribute is cleanly defined
    pub fn uniform(font: &FontSnapshot) -> Self {
        Self {
            all_caps: Some(font.all_caps),
            bold: Some(font.bold),
            italic: Some(font.italic),
            strikethrough: Some(font.strikethrough),
            double_strikethrough: Some(font.double_strikethrough),
            subscript: Some(font.subscript),
            superscript: Some(font.superscript),
            small_caps: Some(font.small_caps),
            color: Some(font.color.clone()),
            name: Some(font.name.clone()),
            size: Some(font.size),
            underline: Some(font.underline),
        }
    }

    /// Whether the given attribute has a defined value in this probe
    pub fn is_defined(&self, attribute: FontAttribute) -> bool {
        match attribute {
            FontAttribute::AllCaps => self.all_caps.is_some(),
            FontAttribute::Bold => self.bold.is_some(),
            FontAttribute::Italic => self.italic.is_some(),
            FontAttribute::Strikethrough => self.strikethrough.is_some(),
            FontAttribute::DoubleStrikethrough => self.double_strikethrough.is_some(),
            FontAttribute::Subscript => self.subscript.is_some(),
            FontAttribute::Superscript => self.superscript.is_some(),
            FontAttribute::SmallCaps => self.small_caps.is_some(),
            FontAttribute::Color => self.color.is_some(),
            FontAttribute::Name => self.name.is_some(),
            FontAttribute::Size => self.size.is_some(),
            FontAttribute::Underline => self.underline.is_some(),
        }
    }

    /// Whether every attribute in `considered` is defined
    pub fn is_uniform_over<'a>(&self, considered: impl IntoIterator<Item = &'a FontAttribute>) -> bool {
        considered.into_iter().all(|attribute| self.is_defined(*attribute))
    }

    /// Convert to a snapshot, falling back to fixed defaults for undefined fields
    pub fn into_snapshot(self) -> FontSnapshot {
        let defaults = FontSnapshot::default();
        FontSnapshot {
            all_caps: self.all_caps.unwrap_or(defaults.all_caps),
            bold: self.bold.unwrap_or(defaults.bold),
            italic: self.italic.unwrap_or(defaults.italic),
            strikethrough: self.strikethrough.unwrap_or(defaults.strikethrough),
            double_strikethrough: self.double_strikethrough.unwrap_or(defaults.double_strikethrough),
            subscript: self.subscript.unwrap_or(defaults.subscript),
            superscript: self.superscript.unwrap_or(defaults.superscript),
            small_caps: self.small_caps.unwrap_or(defaults.small_caps),
            color: self.color.unwrap_or(defaults.color),
            name: self.name.unwrap_or(defaults.name),
            size: self.size.unwrap_or(defaults.size),
            underline: self.underline.unwrap_or(defaults.underline),
        }
    }
}

/// Paragraph-level formatting. Each field is independently optional because
/// host support is probed and may be partial.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParagraphFormatSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bullet_visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bullet_type: Option<BulletType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bullet_style: Option<BulletStyle>,
}

impl ParagraphFormatSnapshot {
    /// True when no attribute could be read
    pub fn is_empty(&self) -> bool {
        self.alignment.is_none()
            && self.indent_level.is_none()
            && self.bullet_visible.is_none()
            && self.bullet_type.is_none()
            && self.bullet_style.is_none()
    }

    /// `None` when every attribute failed to read
    pub fn non_empty(self) -> Option<Self> {
        if self.is_empty() { None } else { Some(self) }
    }

    /// Fill the fields still missing in `self` from `other`
    pub fn or(self, other: ParagraphFormatSnapshot) -> Self {
        Self {
            alignment: self.alignment.or(other.alignment),
            indent_level: self.indent_level.or(other.indent_level),
            bullet_visible: self.bullet_visible.or(other.bullet_visible),
            bullet_type: self.bullet_type.or(other.bullet_type),
            bullet_style: self.bullet_style.or(other.bullet_style),
        }
    }
}

/// A contiguous span of uniformly formatted text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    #[serde(default)]
    pub font: FontSnapshot,
}

impl Run {
    pub fn new(text: impl Into<String>, font: FontSnapshot) -> Self {
        Self { text: text.into(), font }
    }

    /// Run with the default font
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, FontSnapshot::default())
    }

    /// Length in characters
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// A line-break delimited segment of a shape's text
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    /// Deterministic id, stable across extract, translate and apply
    pub id: String,
    pub original_char_count: usize,
    /// Never empty: an empty paragraph holds a single empty run
    pub runs: Vec<Run>,
    pub paragraph_format: Option<ParagraphFormatSnapshot>,
}

impl Paragraph {
    /// Concatenated run texts
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// Identity of a shape that survives separate host sessions
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapeLocator {
    pub slide_index: usize,
    /// Ordered ancestor group ids, outermost first
    pub group_path: Vec<String>,
    pub shape_id: String,
}

impl ShapeLocator {
    pub fn new(slide_index: usize, group_path: Vec<String>, shape_id: impl Into<String>) -> Self {
        Self { slide_index, group_path, shape_id: shape_id.into() }
    }

    /// Group path and shape id joined with `/`
    pub fn path_key(&self) -> String {
        let mut parts: Vec<&str> = self.group_path.iter().map(String::as_str).collect();
        parts.push(&self.shape_id);
        parts.join("/")
    }

    /// Id of the paragraph at `index` inside this shape
    pub fn paragraph_id(&self, index: usize) -> String {
        format!("s{}-{}-p{}", self.slide_index, self.path_key(), index)
    }

    /// Id of the table cell at `row`/`column` inside this shape
    pub fn cell_id(&self, row: usize, column: usize) -> String {
        format!("s{}-{}-r{}c{}", self.slide_index, self.path_key(), row, column)
    }
}

/// A free-form text shape and its extracted paragraphs
#[derive(Debug, Clone)]
pub struct ShapeTextTarget {
    pub locator: ShapeLocator,
    pub name: String,
    /// Human-readable path for diagnostics
    pub label: String,
    pub paragraphs: Vec<Paragraph>,
}

/// One table cell with its flat run list
#[derive(Debug, Clone)]
pub struct TableCellTarget {
    pub locator: ShapeLocator,
    pub name: String,
    pub label: String,
    pub row: usize,
    pub column: usize,
    pub id: String,
    pub runs: Vec<Run>,
}

/// All translation targets of one slide
#[derive(Debug, Clone, Default)]
pub struct SlideTargets {
    pub slide_index: usize,
    pub shapes: Vec<ShapeTextTarget>,
    pub cells: Vec<TableCellTarget>,
}

impl SlideTargets {
    pub fn new(slide_index: usize) -> Self {
        Self { slide_index, ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty() && self.cells.is_empty()
    }
}

/// Text of one run, addressed by its index in the original run list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunText {
    pub index: usize,
    pub text: String,
}

/// Translated runs for one paragraph or table cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    pub paragraph_id: String,
    pub translated_runs: Vec<RunText>,
}

impl TranslationResult {
    /// Translated text for the run at `index`, if the provider returned one
    pub fn run_text(&self, index: usize) -> Option<&str> {
        self.translated_runs
            .iter()
            .find(|r| r.index == index)
            .map(|r| r.text.as_str())
    }
}

/// A half-open character range `[start, start + length)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextSpan {
    pub start: usize,
    pub length: usize,
}

impl TextSpan {
    pub fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    pub fn end(&self) -> usize {
        self.start + self.length
    }
}
