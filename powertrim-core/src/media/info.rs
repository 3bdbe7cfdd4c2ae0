//! Probed stream and container metadata.
//!
//! `VideoMetadata` is built from the `ffprobe` crate's view of a file
//! (`-show_streams -show_format`) and holds only what the pipeline uses.

use crate::error::ProbeError;
use crate::media::FrameRate;
use ffprobe::FfProbe;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Image-based subtitle codecs. These cannot be converted to a text format.
pub const BITMAP_SUBTITLE_CODECS: [&str; 4] =
    ["hdmv_pgs_subtitle", "dvd_subtitle", "dvb_subtitle", "xsub"];

/// Kind of a source stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
    /// Data, attachment and unknown streams. Never mapped implicitly.
    Other,
}

impl StreamKind {
    fn from_codec_type(codec_type: &str) -> Self {
        match codec_type {
            "video" => StreamKind::Video,
            "audio" => StreamKind::Audio,
            "subtitle" => StreamKind::Subtitle,
            _ => StreamKind::Other,
        }
    }

    /// Stream specifier letter used by ffmpeg (`v`, `a`, `s`).
    #[must_use]
    pub fn specifier(self) -> Option<char> {
        match self {
            StreamKind::Video => Some('v'),
            StreamKind::Audio => Some('a'),
            StreamKind::Subtitle => Some('s'),
            StreamKind::Other => None,
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamKind::Video => "video",
            StreamKind::Audio => "audio",
            StreamKind::Subtitle => "subtitle",
            StreamKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// One stream of the source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    pub index: usize,
    pub kind: StreamKind,
    pub codec: String,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub forced: bool,
    #[serde(default)]
    pub color_space: Option<String>,
}

impl Stream {
    #[must_use]
    pub fn new(index: usize, kind: StreamKind, codec: &str) -> Self {
        Self {
            index,
            kind,
            codec: codec.to_string(),
            profile: None,
            language: None,
            default: false,
            forced: false,
            color_space: None,
        }
    }

    #[must_use]
    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    #[must_use]
    pub fn is_bitmap_subtitle(&self) -> bool {
        self.kind == StreamKind::Subtitle
            && BITMAP_SUBTITLE_CODECS
                .iter()
                .any(|codec| self.codec.eq_ignore_ascii_case(codec))
    }
}

/// Container and stream metadata of one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub path: PathBuf,
    /// ffprobe format name, e.g. `matroska,webm`.
    pub container: String,
    /// Duration in seconds; `0.0` when the container does not report one.
    pub duration: f64,
    pub frame_rate: FrameRate,
    pub width: u32,
    pub height: u32,
    pub streams: Vec<Stream>,
}

impl VideoMetadata {
    #[must_use]
    pub fn video_stream(&self) -> Option<&Stream> {
        self.streams_of(StreamKind::Video).next()
    }

    pub fn streams_of(&self, kind: StreamKind) -> impl Iterator<Item = &Stream> {
        self.streams.iter().filter(move |s| s.kind == kind)
    }

    #[must_use]
    pub fn stream(&self, index: usize) -> Option<&Stream> {
        self.streams.iter().find(|s| s.index == index)
    }

    #[must_use]
    pub fn has_duration(&self) -> bool {
        self.duration.is_finite() && self.duration > 0.0
    }

    /// `WIDTHxHEIGHT`, as used by the `{resolution}` placeholder.
    #[must_use]
    pub fn resolution_label(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    /// BT.2020 colour space marks HDR sources for crop detection.
    #[must_use]
    pub fn is_hdr(&self) -> bool {
        self.video_stream()
            .and_then(|s| s.color_space.as_deref())
            .is_some_and(|cs| cs.starts_with("bt2020"))
    }

    /// smartcut cannot handle VP9 Profile 2/3 (high bit depth) video.
    #[must_use]
    pub fn supports_smart_cut(&self) -> bool {
        !self.streams_of(StreamKind::Video).any(|s| {
            s.codec.eq_ignore_ascii_case("vp9")
                && matches!(s.profile.as_deref(), Some("Profile 2" | "Profile 3"))
        })
    }

    /// Converts the output of the `ffprobe` crate into pipeline metadata.
    pub fn from_ffprobe(path: &Path, probed: &FfProbe) -> Result<Self, ProbeError> {
        let parse_error = |reason: &str| ProbeError::Parse {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        if probed.streams.is_empty() {
            return Err(parse_error("ffprobe reported no streams"));
        }

        let streams: Vec<Stream> = probed
            .streams
            .iter()
            .enumerate()
            .map(|(position, raw)| convert_stream(position, raw))
            .collect();

        let video = probed
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| ProbeError::NoVideoStream(path.to_path_buf()))?;

        let frame_rate = [video.r_frame_rate.as_str(), video.avg_frame_rate.as_str()]
            .into_iter()
            .find_map(FrameRate::parse)
            .ok_or_else(|| parse_error("video stream has no usable frame rate"))?;

        let duration = probed
            .format
            .duration
            .as_deref()
            .or(video.duration.as_deref())
            .and_then(|d| d.trim().parse::<f64>().ok())
            .unwrap_or(0.0);

        let dimension = |value: Option<i64>| value.and_then(|v| u32::try_from(v).ok()).unwrap_or(0);

        Ok(Self {
            path: path.to_path_buf(),
            container: probed.format.format_name.clone(),
            duration,
            frame_rate,
            width: dimension(video.width),
            height: dimension(video.height),
            streams,
        })
    }
}

fn convert_stream(position: usize, raw: &ffprobe::Stream) -> Stream {
    let language = raw
        .tags
        .as_ref()
        .and_then(|tags| tags.language.as_deref())
        .map(|lang| lang.trim().to_ascii_lowercase())
        .filter(|lang| !lang.is_empty());

    Stream {
        index: usize::try_from(raw.index).unwrap_or(position),
        kind: StreamKind::from_codec_type(raw.codec_type.as_deref().unwrap_or_default()),
        codec: raw.codec_name.clone().unwrap_or_else(|| "unknown".to_string()),
        profile: raw.profile.clone(),
        language,
        default: raw.disposition.default != 0,
        forced: raw.disposition.forced != 0,
        color_space: raw.color_space.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffprobe::{Format, StreamTags};

    fn raw_stream(index: i64, codec_type: &str, codec: &str) -> ffprobe::Stream {
        let mut stream = ffprobe::Stream::default();
        stream.index = index;
        stream.codec_type = Some(codec_type.to_string());
        stream.codec_name = Some(codec.to_string());
        stream
    }

    fn raw_video(codec: &str, rate: &str) -> ffprobe::Stream {
        let mut stream = raw_stream(0, "video", codec);
        stream.r_frame_rate = rate.to_string();
        stream
    }

    fn with_language(mut stream: ffprobe::Stream, language: &str) -> ffprobe::Stream {
        let mut tags = StreamTags::default();
        tags.language = Some(language.to_string());
        stream.tags = Some(tags);
        stream
    }

    fn probed(streams: Vec<ffprobe::Stream>, format_name: &str, duration: Option<&str>) -> FfProbe {
        let mut format = Format::default();
        format.format_name = format_name.to_string();
        format.duration = duration.map(str::to_string);
        FfProbe { streams, format }
    }

    #[test]
    fn converts_streams_and_format() {
        let mut video = raw_video("h264", "24000/1001");
        video.profile = Some("High".to_string());
        video.width = Some(1920);
        video.height = Some(1080);
        video.color_space = Some("bt709".to_string());
        video.disposition.default = 1;

        let mut audio = with_language(raw_stream(1, "audio", "aac"), "jpn");
        audio.disposition.default = 1;
        let mut subtitle = with_language(raw_stream(2, "subtitle", "subrip"), " ENG ");
        subtitle.disposition.forced = 1;

        let input = probed(vec![video, audio, subtitle], "matroska,webm", Some("1420.420000"));
        let meta = VideoMetadata::from_ffprobe(Path::new("/in.mkv"), &input).unwrap();
        assert_eq!(meta.container, "matroska,webm");
        assert!((meta.duration - 1420.42).abs() < 1e-9);
        assert_eq!(meta.frame_rate.to_string(), "24000/1001");
        assert_eq!(meta.resolution_label(), "1920x1080");
        assert_eq!(meta.streams.len(), 3);
        assert!(meta.streams[0].default);
        assert_eq!(meta.streams[0].profile.as_deref(), Some("High"));
        assert_eq!(meta.streams[1].language.as_deref(), Some("jpn"));
        assert_eq!(meta.streams[2].language.as_deref(), Some("eng"));
        assert!(meta.streams[2].forced);
        assert!(!meta.streams[2].default);
        assert!(!meta.is_hdr());
    }

    #[test]
    fn tolerates_missing_audio_and_subtitles() {
        let mut video = raw_video("vp9", "30/1");
        video.width = Some(640);
        video.height = Some(360);
        let input = probed(vec![video], "webm", Some("10.0"));
        let meta = VideoMetadata::from_ffprobe(Path::new("/in.webm"), &input).unwrap();
        assert_eq!(meta.streams_of(StreamKind::Audio).count(), 0);
        assert_eq!(meta.streams_of(StreamKind::Subtitle).count(), 0);
    }

    #[test]
    fn falls_back_to_average_frame_rate_and_stream_duration() {
        let mut video = raw_video("h264", "0/0");
        video.avg_frame_rate = "25/1".to_string();
        let input = probed(vec![video.clone()], "mov,mp4,m4a,3gp,3g2,mj2", None);
        let meta = VideoMetadata::from_ffprobe(Path::new("/in.mp4"), &input).unwrap();
        assert_eq!(meta.frame_rate, FrameRate::new(25, 1).unwrap());
        assert!(!meta.has_duration());

        video.duration = Some("12.5".to_string());
        let input = probed(vec![video], "mov,mp4,m4a,3gp,3g2,mj2", None);
        let meta = VideoMetadata::from_ffprobe(Path::new("/in.mp4"), &input).unwrap();
        assert!((meta.duration - 12.5).abs() < 1e-9);
    }

    #[test]
    fn rejects_output_without_streams_or_frame_rate() {
        let path = Path::new("/in.mkv");
        assert!(matches!(
            VideoMetadata::from_ffprobe(path, &probed(Vec::new(), "matroska,webm", None)),
            Err(ProbeError::Parse { .. })
        ));
        assert!(matches!(
            VideoMetadata::from_ffprobe(path, &probed(vec![raw_video("h264", "0/0")], "matroska,webm", None)),
            Err(ProbeError::Parse { .. })
        ));
    }

    #[test]
    fn audio_only_source_has_no_video_stream() {
        let input = probed(vec![raw_stream(0, "audio", "flac")], "flac", Some("3.0"));
        assert!(matches!(
            VideoMetadata::from_ffprobe(Path::new("/in.flac"), &input),
            Err(ProbeError::NoVideoStream(_))
        ));
    }

    #[test]
    fn high_bit_depth_vp9_blocks_smart_cut() {
        let mut video = raw_video("vp9", "24/1");
        video.profile = Some("Profile 2".to_string());
        video.color_space = Some("bt2020nc".to_string());
        let input = probed(vec![video], "matroska,webm", Some("60"));
        let meta = VideoMetadata::from_ffprobe(Path::new("/in.mkv"), &input).unwrap();
        assert!(!meta.supports_smart_cut());
        assert!(meta.is_hdr());
    }
}
