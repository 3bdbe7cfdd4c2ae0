// ============================================================================
// powertrim-cli/src/segments.rs
// ============================================================================
//
// SEGMENT LISTS: Loading frame ranges from project files, CSV and arguments
//
// The export pipeline consumes an ordered list of segments as-is. This module
// turns the formats the CLI accepts into that list:
//
// - Project JSON: { "video_path": "...", "segments": [{start_frame, end_frame, name, color}] }
// - CSV rows: start,end[,name]; rows that do not start with two integers are skipped
// - Command-line ranges: START-END
//
// Bounds are not checked against the source here. The orchestrator rejects
// empty or inverted ranges and ffmpeg is the authority on out-of-range frames.

use anyhow::{Context, Result, anyhow, bail};
use powertrim_core::Segment;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Contents of a project file.
#[derive(Debug, Deserialize)]
pub struct Project {
    pub video_path: PathBuf,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

impl Project {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read project file '{}'", path.display()))?;
        let mut project: Project = serde_json::from_str(&text)
            .with_context(|| format!("Invalid project file '{}'", path.display()))?;

        // Relative video paths are relative to the project file
        if project.video_path.is_relative() {
            if let Some(parent) = path.parent() {
                project.video_path = parent.join(&project.video_path);
            }
        }
        Ok(project)
    }
}

/// Parses a `START-END` frame range.
pub fn parse_range(text: &str) -> Result<Segment> {
    let (start, end) = text
        .split_once('-')
        .ok_or_else(|| anyhow!("Segment '{text}' is not of the form START-END"))?;
    let start_frame: u64 = start
        .trim()
        .parse()
        .with_context(|| format!("Invalid start frame in segment '{text}'"))?;
    let end_frame: u64 = end
        .trim()
        .parse()
        .with_context(|| format!("Invalid end frame in segment '{text}'"))?;
    if start_frame >= end_frame {
        bail!("Segment '{text}' must end after it starts");
    }
    Ok(Segment::new(start_frame, end_frame))
}

/// Parses CSV text into segments.
pub fn parse_csv(text: &str) -> Vec<Segment> {
    text.lines()
        .filter_map(|line| {
            let mut cells = line.split(',').map(str::trim);
            let start = cells.next()?.parse::<u64>().ok()?;
            let end = cells.next()?.parse::<u64>().ok()?;
            let name = cells.next().unwrap_or_default().trim_matches('"');
            Some(Segment::new(start, end).with_name(name))
        })
        .collect()
}

pub fn load_csv(path: &Path) -> Result<Vec<Segment>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read CSV file '{}'", path.display()))?;
    let segments = parse_csv(&text);
    log::debug!("Loaded {} segment(s) from {}", segments.len(), path.display());
    Ok(segments)
}
