//! Output file naming.
//!
//! Templates use `{placeholder}` fields:
//! `{filename}` (sanitized source stem), `{num}` (1-based segment number,
//! `{num:03d}` zero-pads), `{start}` and `{end}` (frames), `{date}`
//! (`YYYY-MM-DD`), `{time}` (`HH-MM-SS`) and `{resolution}` (`WxH`).
//! Unknown placeholders are left in the name as written.

use crate::config::ExportMode;
use crate::media::Segment;
use crate::utils::sanitize_filename;
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Container extensions a template may end with to choose the output container.
pub const KNOWN_EXTENSIONS: [&str; 13] = [
    "mkv", "mp4", "mov", "m4v", "webm", "avi", "ts", "m2ts", "mts", "mxf", "flv", "mpg", "mpeg",
];

/// Extension used when neither the mode, the template nor the source gives one.
const FALLBACK_EXTENSION: &str = "mkv";

/// Widest `{num:0Nd}` padding accepted; wider specs stay literal.
const MAX_NUMBER_WIDTH: usize = 9;

/// Values shared by every name produced for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingContext {
    pub filename: String,
    pub date: String,
    pub time: String,
    pub resolution: String,
}

impl NamingContext {
    /// Captures the clock once so all clips of a job share date and time.
    #[must_use]
    pub fn new(source: &Path, resolution: String, now: DateTime<Local>) -> Self {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        Self {
            filename: sanitize_filename(&stem),
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%H-%M-%S").to_string(),
            resolution,
        }
    }
}

/// Expands `template` for segment number `num`.
#[must_use]
pub fn expand_template(template: &str, ctx: &NamingContext, num: usize, segment: &Segment) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let key = &after[..close];
        match expand_field(key, ctx, num, segment) {
            Some(value) => out.push_str(&value),
            None => {
                out.push('{');
                out.push_str(key);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

fn expand_field(key: &str, ctx: &NamingContext, num: usize, segment: &Segment) -> Option<String> {
    match key {
        "filename" => Some(ctx.filename.clone()),
        "num" => Some(num.to_string()),
        "start" => Some(segment.start_frame.to_string()),
        "end" => Some(segment.end_frame.to_string()),
        "date" => Some(ctx.date.clone()),
        "time" => Some(ctx.time.clone()),
        "resolution" => Some(ctx.resolution.clone()),
        _ => format_number(key.strip_prefix("num:")?, num),
    }
}

/// Applies a `0Nd` or `Nd` width spec.
fn format_number(spec: &str, num: usize) -> Option<String> {
    let digits = spec.strip_suffix('d')?;
    if digits.is_empty() {
        return Some(num.to_string());
    }
    let zero_pad = digits.starts_with('0');
    let width = digits.parse::<usize>().ok().filter(|w| *w <= MAX_NUMBER_WIDTH)?;
    Some(if zero_pad {
        format!("{num:0width$}")
    } else {
        format!("{num:>width$}")
    })
}

/// Splits an expanded name into stem and container extension.
///
/// ffv1 and re-encode always use their own container. For copy and
/// smart-cut a known extension at the end of the name wins, then the
/// source's extension.
#[must_use]
pub fn split_extension(name: &str, mode: ExportMode, source: &Path) -> (String, String) {
    let (stem, template_ext) = match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty() && KNOWN_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) =>
        {
            (stem.to_string(), Some(ext.to_ascii_lowercase()))
        }
        _ => (name.to_string(), None),
    };

    let ext = match mode.fixed_extension() {
        Some(fixed) => fixed.to_string(),
        None => template_ext
            .or_else(|| {
                source
                    .extension()
                    .map(|e| e.to_string_lossy().to_ascii_lowercase())
                    .filter(|e| !e.is_empty())
            })
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_string()),
    };
    (stem, ext)
}

/// Produces collision-free output paths for one job.
#[derive(Debug)]
pub struct OutputNamer {
    ctx: NamingContext,
    mode: ExportMode,
    source: PathBuf,
    used: HashSet<String>,
}

impl OutputNamer {
    #[must_use]
    pub fn new(ctx: NamingContext, mode: ExportMode, source: &Path) -> Self {
        Self {
            ctx,
            mode,
            source: source.to_path_buf(),
            used: HashSet::new(),
        }
    }

    #[must_use]
    pub fn context(&self) -> &NamingContext {
        &self.ctx
    }

    /// Path in `dir` for segment `num` (1-based) named by `template`.
    ///
    /// A name already handed out by this namer gets `_{num}` appended.
    pub fn clip_path(&mut self, dir: &Path, template: &str, num: usize, segment: &Segment) -> PathBuf {
        let expanded = sanitize_filename(&expand_template(template, &self.ctx, num, segment));
        let (stem, ext) = split_extension(&expanded, self.mode, &self.source);

        let mut candidate = format!("{stem}.{ext}");
        let mut attempt = 1;
        while !self.used.insert(candidate.to_lowercase()) {
            candidate = if attempt == 1 {
                format!("{stem}_{num}.{ext}")
            } else {
                format!("{stem}_{num}_{attempt}.{ext}")
            };
            attempt += 1;
        }
        dir.join(candidate)
    }

    /// Path for the merged output covering `first` to `last`.
    pub fn merged_path(&mut self, dir: &Path, template: &str, first: &Segment, last: &Segment) -> PathBuf {
        let span = Segment::new(first.start_frame, last.end_frame);
        self.clip_path(dir, template, 1, &span)
    }

    /// Staging name for segment `num`, independent of any template.
    #[must_use]
    pub fn staging_path(&self, dir: &Path, num: usize) -> PathBuf {
        let (_, ext) = split_extension("", self.mode, &self.source);
        dir.join(format!("temp_{num:03}.{ext}"))
    }
}
