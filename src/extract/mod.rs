/*!
 * Extraction of translatable text from a presentation host.
 *
 * - `walker`: flattens shape trees into text-bearing leaves
 * - `runs`: reconstructs formatting runs from per-range probes
 * - `paragraphs`: splits text into paragraphs and builds slide targets
 */

pub mod paragraphs;
pub mod runs;
pub mod walker;

pub use self::paragraphs::{split_paragraphs, ParagraphExtractor, ParagraphFormatReader};
pub use self::runs::{DetectionStrategy, RunBoundaryDetector, RunDetectionConfig};
pub use self::walker::{ShapeWalker, VisitedShape};
