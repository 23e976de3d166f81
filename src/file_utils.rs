/*!
 * File and directory utilities for deck files.
 *
 * Decks are JSON documents (see `host::memory::Deck`). Translated decks are
 * written next to their source as `<stem>.<lang>.json`.
 */

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

use crate::host::MemoryDeck;

/// Extension of deck files
pub const DECK_EXTENSION: &str = "json";

/// Matches outputs of earlier runs such as `intro.fr.json` or `intro.deu.json`
static TRANSLATED_DECK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.[a-z]{2,3}\.json$").expect("constant regex"));

/// File operations utility
pub struct FileManager;

impl FileManager {
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    /// Create a directory and its parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Output path for a translated deck: `<output_dir>/<stem>.<lang>.json`
    pub fn generate_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        target_language: &str,
    ) -> PathBuf {
        let stem = input_file.as_ref().file_stem().unwrap_or_default().to_string_lossy();
        output_dir
            .as_ref()
            .join(format!("{}.{}.{}", stem, target_language.to_lowercase(), DECK_EXTENSION))
    }

    /// Whether a file name looks like the output of an earlier translation
    pub fn is_translated_deck<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .file_name()
            .is_some_and(|name| TRANSLATED_DECK.is_match(&name.to_string_lossy()))
    }

    /// Deck files under `dir`, skipping earlier translation outputs, sorted
    pub fn find_decks<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let mut decks = Vec::new();
        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            let is_deck = path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(DECK_EXTENSION));
            if is_deck && !Self::is_translated_deck(path) {
                decks.push(path.to_path_buf());
            }
        }
        decks.sort();
        Ok(decks)
    }

    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path).with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file, creating the parent directory
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))
    }

    /// Load a deck file into an in-memory host
    pub fn read_deck<P: AsRef<Path>>(path: P) -> Result<MemoryDeck> {
        let content = Self::read_to_string(&path)?;
        MemoryDeck::from_json(&content).with_context(|| format!("Invalid deck file: {:?}", path.as_ref()))
    }

    /// Save an in-memory host as a deck file
    pub fn write_deck<P: AsRef<Path>>(path: P, deck: &MemoryDeck) -> Result<()> {
        let json = deck.to_json().context("Failed to serialize deck")?;
        Self::write_to_file(path, &json)
    }
}
