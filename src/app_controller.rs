/*!
 * Application controller for deck translation.
 *
 * [`TranslateScope`] drives one translate scope against any
 * [`PresentationHost`]: slides are processed one after the other, each going
 * through extraction, translation and, in apply mode, write-back. Preview
 * mode translates the same way but leaves the deck untouched.
 *
 * [`Controller`] is the file-level wrapper used by the CLI: it loads deck
 * files into a [`MemoryDeck`], runs a scope and saves the result.
 */

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};

use crate::app_config::Config;
use crate::errors::{AppError, HostError};
use crate::extract::{ParagraphExtractor, RunDetectionConfig, ShapeWalker};
use crate::file_utils::FileManager;
use crate::host::{CellEdit, MemoryDeck, PresentationHost, WriteReport};
use crate::model::{ShapeLocator, SlideTargets, TranslationResult};
use crate::recompose::{compose, merge_paragraph, merge_shape, merge_table_cell};
use crate::translation::{
    CancellationToken, ChunkTranslator, ScopeOptions, TranslationCache, TranslationOrchestrator,
    TranslationService, UsageStats,
};

/// Number of paragraphs shown in a preview
pub const PREVIEW_PARAGRAPHS: usize = 3;

/// Slides covered by a translate scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideSelection {
    /// One slide, zero-based
    Single(usize),
    All,
}

/// What a scope does with its translations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeMode {
    /// Write translations back into the deck
    #[default]
    Apply,
    /// Only report the first translated paragraphs
    Preview,
}

/// Final status of a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeStatus {
    #[default]
    Completed,
    Cancelled,
}

/// Summary of a translate scope
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeReport {
    pub status: ScopeStatus,
    pub slides_processed: usize,
    /// Paragraphs and cells that received a translation
    pub paragraphs_translated: usize,
    pub dispatched_chunks: usize,
    pub failed_chunks: usize,
    pub cache_hits: usize,
    /// Shapes or tables whose write-back failed
    pub skipped_shapes: usize,
    /// Formatting attributes the host refused to write
    pub skipped_attributes: usize,
    /// Preview text, only set in preview mode
    pub preview: Option<String>,
}

impl ScopeReport {
    pub fn is_cancelled(&self) -> bool {
        self.status == ScopeStatus::Cancelled
    }
}

/// One translate scope over a presentation host
pub struct TranslateScope<'a> {
    host: &'a dyn PresentationHost,
    translator: &'a dyn ChunkTranslator,
    options: ScopeOptions,
    walker: ShapeWalker,
    run_detection: RunDetectionConfig,
    mode: ScopeMode,
    progress: Option<ProgressBar>,
}

impl<'a> TranslateScope<'a> {
    pub fn new(host: &'a dyn PresentationHost, translator: &'a dyn ChunkTranslator, options: ScopeOptions) -> Self {
        Self {
            host,
            translator,
            options,
            walker: ShapeWalker::default(),
            run_detection: RunDetectionConfig::default(),
            mode: ScopeMode::Apply,
            progress: None,
        }
    }

    pub fn with_walker(mut self, walker: ShapeWalker) -> Self {
        self.walker = walker;
        self
    }

    pub fn with_run_detection(mut self, run_detection: RunDetectionConfig) -> Self {
        self.run_detection = run_detection;
        self
    }

    pub fn with_mode(mut self, mode: ScopeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Report progress per slide on the given bar
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run the scope.
    ///
    /// Only a missing credential or an unreadable slide count fails the scope.
    /// Everything below slide level is logged and skipped.
    pub async fn run(&self, selection: SlideSelection, cancel: &CancellationToken) -> Result<ScopeReport, AppError> {
        self.translator.check_credentials()?;

        let slide_count = self.host.slide_count().await?;
        let slides: Vec<usize> = match selection {
            SlideSelection::Single(index) if index < slide_count => vec![index],
            SlideSelection::Single(index) => return Err(HostError::SlideNotFound(index).into()),
            SlideSelection::All => (0..slide_count).collect(),
        };

        let extractor = ParagraphExtractor::negotiate(self.host, self.run_detection).await;
        let orchestrator = TranslationOrchestrator::new(self.translator, TranslationCache::new());
        let mut report = ScopeReport::default();
        let mut preview = Vec::new();

        if let Some(pb) = &self.progress {
            pb.set_length(slides.len() as u64);
        }

        for slide_index in slides {
            if cancel.is_cancelled() {
                info!("Cancelled before slide {}", slide_index + 1);
                report.status = ScopeStatus::Cancelled;
                break;
            }
            if let Some(pb) = &self.progress {
                pb.set_message(format!("Slide {}", slide_index + 1));
            }

            let targets = match extractor.extract_slide(self.host, &self.walker, slide_index).await {
                Ok(targets) => targets,
                Err(e) => {
                    warn!("Skipping slide {}: {}", slide_index + 1, e);
                    self.advance();
                    continue;
                }
            };

            let outcome = orchestrator
                .translate(std::slice::from_ref(&targets), &self.options, cancel)
                .await;
            report.dispatched_chunks += outcome.dispatched_chunks;
            report.failed_chunks += outcome.failed_chunks;
            report.cache_hits += outcome.cache_hits;
            report.paragraphs_translated += outcome.order.iter().filter(|id| outcome.results.contains_key(*id)).count();

            match self.mode {
                ScopeMode::Apply => {
                    let (skipped_shapes, written) = self.apply(&targets, &outcome.results).await;
                    report.skipped_shapes += skipped_shapes;
                    report.skipped_attributes += written.skipped_attributes;
                }
                ScopeMode::Preview => {
                    let missing = PREVIEW_PARAGRAPHS.saturating_sub(preview.len());
                    preview.extend(
                        translated_texts(&targets, &outcome.results, self.options.keep_line_breaks)
                            .into_iter()
                            .take(missing),
                    );
                }
            }

            report.slides_processed += 1;
            self.advance();
            info!(
                "Slide {}: {} chunk(s) sent, {} failed",
                slide_index + 1,
                outcome.dispatched_chunks,
                outcome.failed_chunks
            );

            if outcome.cancelled {
                report.status = ScopeStatus::Cancelled;
                break;
            }
        }

        if self.mode == ScopeMode::Preview {
            report.preview = Some(preview.join("\n\n"));
        }
        Ok(report)
    }

    fn advance(&self) {
        if let Some(pb) = &self.progress {
            pb.inc(1);
        }
    }

    /// Write translations of one slide back into the host
    async fn apply(&self, targets: &SlideTargets, results: &HashMap<String, TranslationResult>) -> (usize, WriteReport) {
        let mut skipped = 0;
        let mut written = WriteReport::default();

        for shape in &targets.shapes {
            if !shape.paragraphs.iter().any(|p| results.contains_key(&p.id)) {
                continue;
            }
            let merged = merge_shape(shape, results, self.options.keep_line_breaks);
            let edit = compose(&merged, self.options.keep_line_breaks).into_shape_edit(self.options.reapply_underline);
            match self.host.write_shape(&shape.locator, edit).await {
                Ok(report) => written.merge(report),
                Err(e) => {
                    warn!("Failed to write shape '{}': {}", shape.label, e);
                    skipped += 1;
                }
            }
        }

        // Cells of one table are written together, tables in document order
        let mut tables: Vec<(&ShapeLocator, &str, Vec<CellEdit>)> = Vec::new();
        for cell in &targets.cells {
            let Some(result) = results.get(&cell.id) else {
                continue;
            };
            let edit = merge_table_cell(cell, Some(result), self.options.keep_line_breaks);
            match tables.iter_mut().find(|(locator, _, _)| **locator == cell.locator) {
                Some((_, _, edits)) => edits.push(edit),
                None => tables.push((&cell.locator, cell.label.as_str(), vec![edit])),
            }
        }
        for (locator, label, edits) in tables {
            debug!("Writing {} cell(s) of table '{}'", edits.len(), label);
            match self.host.write_table_cells(locator, edits).await {
                Ok(report) => written.merge(report),
                Err(e) => {
                    warn!("Failed to write table '{}': {}", label, e);
                    skipped += 1;
                }
            }
        }

        (skipped, written)
    }
}

/// Merged texts of the translated paragraphs and cells of a slide, blank
/// ones left out
fn translated_texts(
    targets: &SlideTargets,
    results: &HashMap<String, TranslationResult>,
    keep_line_breaks: bool,
) -> Vec<String> {
    let paragraphs = targets
        .shapes
        .iter()
        .flat_map(|shape| &shape.paragraphs)
        .filter_map(|p| results.get(&p.id).map(|result| merge_paragraph(p, Some(result), keep_line_breaks).text()));
    let cells = targets.cells.iter().filter_map(|cell| {
        results
            .get(&cell.id)
            .map(|result| merge_table_cell(cell, Some(result), keep_line_breaks).runs.iter().map(|run| run.text.as_str()).collect::<String>())
    });
    paragraphs.chain(cells).filter(|text: &String| !text.trim().is_empty()).collect()
}

/// Options of one CLI run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub selection: SlideSelection,
    pub mode: ScopeMode,
    pub force_overwrite: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            selection: SlideSelection::All,
            mode: ScopeMode::Apply,
            force_overwrite: false,
        }
    }
}

/// Main application controller for deck files
pub struct Controller {
    config: Config,
    service: TranslationService,
}

impl Controller {
    /// Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let service = TranslationService::new(config.translation.clone())?;
        Ok(Self { config, service })
    }

    /// Create a controller around an existing translation service
    pub fn with_service(config: Config, service: TranslationService) -> Self {
        Self { config, service }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Usage statistics of the underlying service
    pub fn usage(&self) -> UsageStats {
        self.service.usage()
    }

    /// Test the connection to the configured provider
    pub async fn test_connection(&self) -> Result<()> {
        self.service.test_connection().await
    }

    fn progress_style(unit: &str) -> ProgressStyle {
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}}",
                unit
            ))
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░")
    }

    /// Translate one deck file.
    ///
    /// Returns `None` when the output already exists and overwriting is off.
    pub async fn run(
        &self,
        input_file: PathBuf,
        output_dir: PathBuf,
        options: RunOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<ScopeReport>> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress(&input_file, &output_dir, options, cancel, &multi_progress)
            .await
    }

    async fn run_with_progress(
        &self,
        input_file: &Path,
        output_dir: &Path,
        options: RunOptions,
        cancel: &CancellationToken,
        multi_progress: &MultiProgress,
    ) -> Result<Option<ScopeReport>> {
        let start_time = Instant::now();

        if !FileManager::file_exists(input_file) {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }

        let output_path = FileManager::generate_output_path(input_file, output_dir, &self.config.target_language);
        if options.mode == ScopeMode::Apply && output_path.exists() && !options.force_overwrite {
            warn!(
                "Skipping {:?}, translation already exists (use -f to force overwrite)",
                input_file
            );
            return Ok(None);
        }

        let deck = FileManager::read_deck(input_file)?;
        let walker = ShapeWalker::new(self.config.deck.exclusion_regex()?);

        let progress_bar = multi_progress.add(ProgressBar::new(0));
        progress_bar.set_style(Self::progress_style("slides"));

        let scope = TranslateScope::new(&deck, &self.service, self.config.scope_options())
            .with_walker(walker)
            .with_run_detection(self.config.deck.run_detection())
            .with_mode(options.mode)
            .with_progress(progress_bar.clone());
        let report = scope.run(options.selection, cancel).await;
        progress_bar.finish_and_clear();
        let report = report.context("Translation failed")?;

        match options.mode {
            ScopeMode::Apply => {
                FileManager::write_deck(&output_path, &deck)?;
                info!("Success: {}", output_path.display());
            }
            ScopeMode::Preview => {
                if let Some(preview) = &report.preview {
                    println!("{}", preview);
                }
            }
        }

        if report.failed_chunks > 0 {
            warn!("{} chunk(s) failed, their text was left untouched", report.failed_chunks);
        }
        if report.skipped_attributes > 0 {
            debug!("{} formatting attribute(s) could not be written", report.skipped_attributes);
        }
        if report.is_cancelled() {
            warn!("Translation cancelled after {} slide(s)", report.slides_processed);
        }
        info!(
            "Translated {} paragraph(s) on {} slide(s) in {}",
            report.paragraphs_translated,
            report.slides_processed,
            Self::format_duration(start_time.elapsed())
        );

        Ok(Some(report))
    }

    /// Translate every deck file under a directory.
    ///
    /// Outputs go next to each input unless `output_dir` is given. Failures of
    /// single files are logged and the next file is processed.
    pub async fn run_folder(
        &self,
        input_dir: PathBuf,
        output_dir: Option<PathBuf>,
        options: RunOptions,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let start_time = Instant::now();

        if !FileManager::dir_exists(&input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let decks = FileManager::find_decks(&input_dir)?;
        if decks.is_empty() {
            warn!("No deck files found in {:?}", input_dir);
            return Ok(());
        }
        info!("Found {} deck file(s)", decks.len());

        let multi_progress = MultiProgress::new();
        let folder_pb = multi_progress.add(ProgressBar::new(decks.len() as u64));
        folder_pb.set_style(Self::progress_style("files"));

        let mut failures = 0;
        for deck in decks {
            if cancel.is_cancelled() {
                warn!("Cancelled, remaining files are left untranslated");
                break;
            }
            let file_name = deck.file_name().unwrap_or_default().to_string_lossy().to_string();
            folder_pb.set_message(format!("Processing: {}", file_name));

            let target_dir = match &output_dir {
                Some(dir) => dir.clone(),
                None => deck.parent().map(Path::to_path_buf).unwrap_or_default(),
            };
            if let Err(e) = self
                .run_with_progress(&deck, &target_dir, options, cancel, &multi_progress)
                .await
            {
                error!("Failed to translate {}: {:#}", file_name, e);
                failures += 1;
            }
            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");
        if failures > 0 {
            warn!("{} file(s) failed", failures);
        }
        info!("Folder processed in {}", Self::format_duration(start_time.elapsed()));
        Ok(())
    }

    /// Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
