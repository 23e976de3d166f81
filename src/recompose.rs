/*!
 * Recomposition of translated text.
 *
 * Translated runs are merged back into the original run structure, then a
 * shape's paragraphs are joined into one text with two offset tables: the
 * character range of every paragraph with its paragraph format, and of every
 * run with its font. The host writes the text first and applies both tables
 * in order.
 *
 * A run never carries a paragraph break: line breaks the model puts inside a
 * translated run become soft line breaks, or spaces when line breaks are not
 * kept.
 */

use std::collections::HashMap;

use crate::host::{CellEdit, ShapeEdit};
use crate::model::{
    FontSnapshot, Paragraph, ParagraphFormatSnapshot, Run, ShapeTextTarget, TableCellTarget, TextSpan,
    TranslationResult,
};
use crate::translation::items::is_non_translatable;

/// Full text of a shape with the formatting to reapply
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedText {
    pub text: String,
    pub paragraph_formats: Vec<(TextSpan, ParagraphFormatSnapshot)>,
    pub fonts: Vec<(TextSpan, FontSnapshot)>,
}

impl ComposedText {
    /// Host edit for this text; `apply_underline` false leaves underline
    /// untouched on write
    pub fn into_shape_edit(self, apply_underline: bool) -> ShapeEdit {
        ShapeEdit {
            text: self.text,
            paragraph_formats: self.paragraph_formats,
            fonts: self.fonts,
            apply_underline,
        }
    }
}

/// Put `translated` between the leading and trailing whitespace of `original`.
///
/// Whitespace-only originals are returned unchanged, and so are runs whose
/// translation is blank.
pub fn splice_whitespace(original: &str, translated: &str) -> String {
    let core = original.trim();
    if core.is_empty() {
        return original.to_string();
    }
    let translated = translated.trim();
    if translated.is_empty() {
        return original.to_string();
    }
    let leading = &original[..original.len() - original.trim_start().len()];
    let trailing = &original[original.trim_end().len()..];
    format!("{}{}{}", leading, translated, trailing)
}

/// Soft line break inside a paragraph
pub const LINE_BREAK: char = '\u{000B}';

/// Replace `\r\n`, `\r` and `\n` inside a translated run.
///
/// With `keep_line_breaks` each break becomes a [`LINE_BREAK`]. Otherwise
/// every break and the whitespace around it collapse to a single space.
pub fn normalize_line_breaks(text: &str, keep_line_breaks: bool) -> String {
    if !text.contains(['\r', '\n']) {
        return text.to_string();
    }
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    if keep_line_breaks {
        return unified.replace('\n', &LINE_BREAK.to_string());
    }
    let mut collapsed = String::with_capacity(unified.len());
    for (i, line) in unified.split('\n').enumerate() {
        let line = if i == 0 { line.trim_end() } else { line.trim() };
        if line.is_empty() {
            continue;
        }
        if !collapsed.is_empty() {
            collapsed.push(' ');
        }
        collapsed.push_str(line);
    }
    collapsed
}

/// Replace run texts by index, keeping fonts
fn merge_runs(runs: &[Run], result: Option<&TranslationResult>, keep_line_breaks: bool) -> Vec<Run> {
    runs.iter()
        .enumerate()
        .map(|(index, run)| {
            let translated = result
                .filter(|_| !is_non_translatable(&run.text))
                .and_then(|r| r.run_text(index));
            match translated {
                Some(text) => Run::new(
                    splice_whitespace(&run.text, &normalize_line_breaks(text, keep_line_breaks)),
                    run.font.clone(),
                ),
                None => run.clone(),
            }
        })
        .collect()
}

/// New paragraph with the translated runs merged in.
///
/// Non-translatable runs and runs missing from `result` keep their text.
pub fn merge_paragraph(paragraph: &Paragraph, result: Option<&TranslationResult>, keep_line_breaks: bool) -> Paragraph {
    Paragraph {
        id: paragraph.id.clone(),
        original_char_count: paragraph.original_char_count,
        runs: merge_runs(&paragraph.runs, result, keep_line_breaks),
        paragraph_format: paragraph.paragraph_format.clone(),
    }
}

/// Merge every paragraph of a shape with its result, if any
pub fn merge_shape(
    shape: &ShapeTextTarget,
    results: &HashMap<String, TranslationResult>,
    keep_line_breaks: bool,
) -> Vec<Paragraph> {
    shape
        .paragraphs
        .iter()
        .map(|p| merge_paragraph(p, results.get(&p.id), keep_line_breaks))
        .collect()
}

/// Join paragraphs into one text and compute the formatting offsets.
///
/// Paragraphs are separated by `\n` when `keep_line_breaks` is set and by a
/// single space otherwise, with no separator after the last one. Empty runs
/// get no font span.
pub fn compose(paragraphs: &[Paragraph], keep_line_breaks: bool) -> ComposedText {
    let joiner = if keep_line_breaks { '\n' } else { ' ' };
    let mut text = String::new();
    let mut offset = 0;
    let mut paragraph_formats = Vec::new();
    let mut fonts = Vec::new();

    for (i, paragraph) in paragraphs.iter().enumerate() {
        if i > 0 {
            text.push(joiner);
            offset += 1;
        }
        let paragraph_start = offset;
        for run in &paragraph.runs {
            let length = run.char_count();
            if length > 0 {
                fonts.push((TextSpan::new(offset, length), run.font.clone()));
            }
            text.push_str(&run.text);
            offset += length;
        }
        if let Some(format) = &paragraph.paragraph_format {
            paragraph_formats.push((TextSpan::new(paragraph_start, offset - paragraph_start), format.clone()));
        }
    }

    ComposedText { text, paragraph_formats, fonts }
}

/// Runs of a table cell with translated text substituted index for index
pub fn merge_table_cell(cell: &TableCellTarget, result: Option<&TranslationResult>, keep_line_breaks: bool) -> CellEdit {
    CellEdit {
        row: cell.row,
        column: cell.column,
        runs: merge_runs(&cell.runs, result, keep_line_breaks),
    }
}
