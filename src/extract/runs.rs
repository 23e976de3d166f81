/*!
 * Run reconstruction for hosts that only expose plain text.
 *
 * The host can report the font of any character range but not where the
 * formatting changes. Two strategies recover the minimal run partition:
 *
 * - character scan: probe every character in one batched round trip and
 *   merge equal neighbors; exact, O(n) probes
 * - binary split: probe a range, keep it when every attribute is defined,
 *   otherwise halve it; each level of the split is one batched round trip,
 *   so sparse formatting resolves in O(log n) round trips
 *
 * Both strategies end with the same merge, so their output is identical for
 * any host that reports mixed attributes as undefined.
 */

use log::debug;

use crate::errors::HostError;
use crate::host::{HostCapabilities, PresentationHost};
use crate::model::{FontAttribute, FontProbe, FontSnapshot, Run, ShapeLocator, TextSpan};

/// Tuning of the run detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunDetectionConfig {
    /// Paragraphs longer than this use the binary split
    pub scan_threshold: usize,

    /// Spans this short are never split further, even when ambiguous
    pub min_split_len: usize,

    /// Split depth after which ambiguous spans are accepted as uniform
    pub max_depth: usize,
}

impl Default for RunDetectionConfig {
    fn default() -> Self {
        Self {
            scan_threshold: 1500,
            min_split_len: 1,
            max_depth: 32,
        }
    }
}

/// Strategy picked for one paragraph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionStrategy {
    CharacterScan,
    BinarySplit,
}

/// Reconstructs runs from per-range font probes
#[derive(Debug, Clone)]
pub struct RunBoundaryDetector {
    config: RunDetectionConfig,
    /// Attributes whose absence marks a probe as ambiguous
    considered: Vec<FontAttribute>,
}

impl RunBoundaryDetector {
    /// Create a detector for a host with the given capabilities.
    ///
    /// Attributes the host cannot read are never treated as ambiguity.
    pub fn new(config: RunDetectionConfig, capabilities: &HostCapabilities) -> Self {
        Self {
            config,
            considered: capabilities.supported_font_attributes(),
        }
    }

    /// Strategy used for a paragraph of `char_count` characters
    pub fn strategy_for(&self, char_count: usize) -> DetectionStrategy {
        if char_count > self.config.scan_threshold {
            DetectionStrategy::BinarySplit
        } else {
            DetectionStrategy::CharacterScan
        }
    }

    /// Detect the runs of `text`, which starts at character `offset` of the
    /// shape's full text.
    pub async fn detect(
        &self,
        host: &dyn PresentationHost,
        locator: &ShapeLocator,
        text: &str,
        offset: usize,
    ) -> Result<Vec<Run>, HostError> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Ok(vec![Run::plain("")]);
        }

        let leaves = match self.strategy_for(chars.len()) {
            DetectionStrategy::CharacterScan => self.scan(host, locator, chars.len(), offset).await?,
            DetectionStrategy::BinarySplit => self.bisect(host, locator, chars.len(), offset).await?,
        };

        Ok(merge_leaves(&chars, leaves))
    }

    async fn scan(
        &self,
        host: &dyn PresentationHost,
        locator: &ShapeLocator,
        len: usize,
        offset: usize,
    ) -> Result<Vec<(TextSpan, FontSnapshot)>, HostError> {
        let spans: Vec<TextSpan> = (0..len).map(|i| TextSpan::new(offset + i, 1)).collect();
        let probes = probe_checked(host, locator, &spans).await?;

        Ok(probes
            .into_iter()
            .enumerate()
            .map(|(i, probe)| (TextSpan::new(i, 1), probe.into_snapshot()))
            .collect())
    }

    async fn bisect(
        &self,
        host: &dyn PresentationHost,
        locator: &ShapeLocator,
        len: usize,
        offset: usize,
    ) -> Result<Vec<(TextSpan, FontSnapshot)>, HostError> {
        let mut leaves = Vec::new();
        let mut frontier = vec![TextSpan::new(0, len)];
        let mut depth = 0;

        while !frontier.is_empty() {
            let absolute: Vec<TextSpan> = frontier
                .iter()
                .map(|span| TextSpan::new(offset + span.start, span.length))
                .collect();
            let probes = probe_checked(host, locator, &absolute).await?;

            let mut next = Vec::new();
            for (span, probe) in frontier.into_iter().zip(probes) {
                if self.is_leaf(&span, &probe, depth) {
                    leaves.push((span, probe.into_snapshot()));
                } else {
                    let half = span.length / 2;
                    next.push(TextSpan::new(span.start, half));
                    next.push(TextSpan::new(span.start + half, span.length - half));
                }
            }

            debug!(
                "Bisection depth {}: {} leaves, {} spans pending",
                depth,
                leaves.len(),
                next.len()
            );
            frontier = next;
            depth += 1;
        }

        leaves.sort_by_key(|(span, _)| span.start);
        Ok(leaves)
    }

    /// A span stops splitting when it is a single character, cleanly uniform,
    /// or below the ambiguity floor
    fn is_leaf(&self, span: &TextSpan, probe: &FontProbe, depth: usize) -> bool {
        span.length <= 1
            || probe.is_uniform_over(&self.considered)
            || span.length <= self.config.min_split_len
            || depth >= self.config.max_depth
    }
}

async fn probe_checked(
    host: &dyn PresentationHost,
    locator: &ShapeLocator,
    spans: &[TextSpan],
) -> Result<Vec<FontProbe>, HostError> {
    let probes = host.probe_fonts(locator, spans).await?;
    if probes.len() != spans.len() {
        return Err(HostError::Unsupported(format!(
            "host answered {} font probes for {} ranges",
            probes.len(),
            spans.len()
        )));
    }
    Ok(probes)
}

/// Turn sorted, contiguous leaf spans into maximal runs
fn merge_leaves(chars: &[char], leaves: Vec<(TextSpan, FontSnapshot)>) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for (span, font) in leaves {
        let text: String = chars[span.start..span.end()].iter().collect();
        if let Some(last) = runs.last_mut().filter(|r| r.font == font) {
            last.text.push_str(&text);
            continue;
        }
        runs.push(Run::new(text, font));
    }
    runs
}
