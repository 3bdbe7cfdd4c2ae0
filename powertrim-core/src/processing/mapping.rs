//! Stream mapping and default disposition planning.
//!
//! Turns the probed streams plus the caller's selection into an ordered list
//! of map directives and one default flag per stream kind. Planning is pure:
//! the same inputs always produce the same plan.

use crate::error::MappingError;
use crate::media::{Stream, StreamKind};
use std::collections::BTreeSet;

/// Kinds that receive disposition flags, in output order.
const DISPOSITION_KINDS: [StreamKind; 3] = [StreamKind::Video, StreamKind::Audio, StreamKind::Subtitle];

/// One source stream carried into the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapDirective {
    pub source_index: usize,
    pub kind: StreamKind,
    /// Position among the output streams of the same kind.
    pub output_index: usize,
    pub language: Option<String>,
    pub forced: bool,
}

/// The output stream of a kind that is flagged as default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispositionDirective {
    pub kind: StreamKind,
    pub output_index: usize,
    pub source_index: usize,
}

/// Result of planning the stream layout of one clip.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MappingPlan {
    pub maps: Vec<MapDirective>,
    pub defaults: Vec<DispositionDirective>,
}

impl MappingPlan {
    #[must_use]
    pub fn has_kind(&self, kind: StreamKind) -> bool {
        self.maps.iter().any(|m| m.kind == kind)
    }

    #[must_use]
    pub fn default_for(&self, kind: StreamKind) -> Option<&DispositionDirective> {
        self.defaults.iter().find(|d| d.kind == kind)
    }

    /// ffmpeg arguments for the plan: `-map` per stream, then dispositions.
    ///
    /// A kind with no mapped stream is disabled with `-vn`, `-an` or `-sn`.
    #[must_use]
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.maps.len() * 4 + 2);
        for map in &self.maps {
            args.push("-map".to_string());
            args.push(format!("0:{}", map.source_index));
        }

        for kind in DISPOSITION_KINDS {
            let Some(spec) = kind.specifier() else {
                continue;
            };
            if !self.has_kind(kind) {
                args.push(format!("-{spec}n"));
                continue;
            }
            let default = self.default_for(kind).map(|d| d.output_index);
            for map in self.maps.iter().filter(|m| m.kind == kind) {
                let flags = match (default == Some(map.output_index), map.forced) {
                    (true, true) => "default+forced",
                    (true, false) => "default",
                    (false, true) => "forced",
                    (false, false) => "0",
                };
                args.push(format!("-disposition:{spec}:{}", map.output_index));
                args.push(flags.to_string());
            }
        }
        args
    }
}

/// Fills in the effective selection for a job.
///
/// An empty selection keeps every video, audio and subtitle stream. A
/// selection without a video stream gets every video stream added, since a
/// clip always carries picture.
#[must_use]
pub fn resolve_selection(streams: &[Stream], selection: &BTreeSet<usize>) -> BTreeSet<usize> {
    if selection.is_empty() {
        return streams
            .iter()
            .filter(|s| s.kind != StreamKind::Other)
            .map(|s| s.index)
            .collect();
    }

    let mut resolved = selection.clone();
    let has_video = streams
        .iter()
        .any(|s| s.kind == StreamKind::Video && selection.contains(&s.index));
    if !has_video {
        resolved.extend(
            streams
                .iter()
                .filter(|s| s.kind == StreamKind::Video)
                .map(|s| s.index),
        );
    }
    resolved
}

/// Selected streams that are image-based subtitles.
#[must_use]
pub fn bitmap_subtitles<'a>(streams: &'a [Stream], selection: &BTreeSet<usize>) -> Vec<&'a Stream> {
    streams
        .iter()
        .filter(|s| selection.contains(&s.index) && s.is_bitmap_subtitle())
        .collect()
}

/// Plans stream maps and default flags from probed streams.
pub struct MappingBuilder<'a> {
    streams: &'a [Stream],
    language_priority: &'a [String],
}

impl<'a> MappingBuilder<'a> {
    #[must_use]
    pub fn new(streams: &'a [Stream], language_priority: &'a [String]) -> Self {
        Self {
            streams,
            language_priority,
        }
    }

    /// Builds the plan for the selected stream indices.
    ///
    /// Selected streams keep their source order. For each kind the default
    /// is the stream whose language ranks highest in the priority list; a
    /// tie goes to the stream that comes first in the source, and when no
    /// language matches the first selected stream of that kind is used.
    pub fn build(&self, selection: &BTreeSet<usize>) -> Result<MappingPlan, MappingError> {
        if let Some(unknown) = selection
            .iter()
            .find(|idx| !self.streams.iter().any(|s| s.index == **idx))
        {
            return Err(MappingError::UnknownStream(*unknown));
        }

        let mut maps: Vec<MapDirective> = Vec::new();
        for stream in self.streams.iter().filter(|s| selection.contains(&s.index)) {
            let output_index = maps.iter().filter(|m| m.kind == stream.kind).count();
            maps.push(MapDirective {
                source_index: stream.index,
                kind: stream.kind,
                output_index,
                language: stream.language.clone(),
                forced: stream.forced,
            });
        }

        let defaults = DISPOSITION_KINDS
            .iter()
            .filter_map(|kind| self.pick_default(&maps, *kind))
            .collect();

        Ok(MappingPlan { maps, defaults })
    }

    fn pick_default(&self, maps: &[MapDirective], kind: StreamKind) -> Option<DispositionDirective> {
        maps.iter()
            .filter(|m| m.kind == kind)
            .enumerate()
            .min_by_key(|(order, m)| (self.language_rank(m.language.as_deref()), *order))
            .map(|(_, m)| DispositionDirective {
                kind,
                output_index: m.output_index,
                source_index: m.source_index,
            })
    }

    fn language_rank(&self, language: Option<&str>) -> usize {
        language
            .and_then(|lang| {
                self.language_priority
                    .iter()
                    .position(|p| p.trim().eq_ignore_ascii_case(lang))
            })
            .unwrap_or(self.language_priority.len())
    }
}
