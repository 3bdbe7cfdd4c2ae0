// powertrim-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use powertrim_core::ExportMode;
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "PowerTrim: Segment-based media export",
    long_about = "Exports frame ranges of a video as separate or merged clips using ffmpeg via powertrim-core."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug output on the console
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Exports segments of a source video
    Export(ExportArgs),
    /// Prints container, timing and stream information of a source
    Probe(ProbeArgs),
}

/// Export strategy as accepted on the command line.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Stream copy, cuts on keyframes
    Copy,
    /// Frame-accurate cut with the smartcut tool
    SmartCut,
    /// Re-encode to H.264/AAC in MP4
    ReEncode,
    /// Lossless FFV1 in Matroska
    Ffv1,
}

impl From<ModeArg> for ExportMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Copy => ExportMode::Copy,
            ModeArg::SmartCut => ExportMode::SmartCut,
            ModeArg::ReEncode => ExportMode::ReEncode,
            ModeArg::Ffv1 => ExportMode::Ffv1,
        }
    }
}

/// Locations of the external tools. Unset paths are resolved automatically.
#[derive(Args, Debug, Default)]
pub struct ToolArgs {
    /// Path to the ffmpeg executable
    #[arg(long, value_name = "PATH", env = "POWERTRIM_FFMPEG")]
    pub ffmpeg: Option<PathBuf>,

    /// Path to the ffprobe executable
    #[arg(long, value_name = "PATH", env = "POWERTRIM_FFPROBE")]
    pub ffprobe: Option<PathBuf>,

    /// Path to the smartcut executable
    #[arg(long, value_name = "PATH", env = "POWERTRIM_SMARTCUT")]
    pub smartcut: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// JSON job file holding settings and segments; other inputs are ignored
    #[arg(long = "job", value_name = "JOB_FILE", conflicts_with_all = ["input", "project", "csv"])]
    pub job_file: Option<PathBuf>,

    /// Source video file
    #[arg(short = 'i', long = "input", value_name = "SOURCE")]
    pub input: Option<PathBuf>,

    /// Project JSON file with `video_path` and `segments`
    #[arg(short = 'p', long = "project", value_name = "PROJECT_FILE", conflicts_with = "csv")]
    pub project: Option<PathBuf>,

    /// CSV segment list with rows `start,end[,name]`
    #[arg(long = "csv", value_name = "CSV_FILE")]
    pub csv: Option<PathBuf>,

    /// Segment as a frame range, e.g. 240-1680 (repeatable)
    #[arg(short = 's', long = "segment", value_name = "START-END")]
    pub segments: Vec<String>,

    /// Directory where clips are written (defaults to the source directory)
    #[arg(short = 'o', long = "output", value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Optional: Directory for log files (defaults to OUTPUT_DIR/logs)
    #[arg(short, long, value_name = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Export strategy
    #[arg(short = 'm', long, value_enum, default_value_t = ModeArg::Copy)]
    pub mode: ModeArg,

    /// Join all clips into one output file
    #[arg(long, default_value_t = false)]
    pub merge: bool,

    /// Output name template, e.g. "{filename}_{num:03d}"
    #[arg(short = 't', long, value_name = "TEMPLATE")]
    pub template: Option<String>,

    /// Comma-separated source stream indices to keep (default: all)
    #[arg(long, value_delimiter = ',', value_name = "INDICES")]
    pub tracks: Vec<usize>,

    /// Comma-separated language priority for the default track, e.g. eng,jpn
    #[arg(long = "lang", value_delimiter = ',', value_name = "LANGS")]
    pub languages: Vec<String>,

    /// Detect black bars and crop them (re-encode only)
    #[arg(long, default_value_t = false)]
    pub crop: bool,

    /// Abort the job on the first failed segment
    #[arg(long, default_value_t = false)]
    pub stop_on_error: bool,

    #[command(flatten)]
    pub tools: ToolArgs,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Source video file
    #[arg(required = true, value_name = "SOURCE")]
    pub input: PathBuf,

    /// Print the metadata as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[command(flatten)]
    pub tools: ToolArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_export_basic_args() {
        let cli = Cli::parse_from(["powertrim", "export", "-i", "show.mkv", "-s", "0-250"]);
        match cli.command {
            Commands::Export(args) => {
                assert_eq!(args.input, Some(PathBuf::from("show.mkv")));
                assert_eq!(args.segments, vec!["0-250".to_string()]);
                assert_eq!(args.mode, ModeArg::Copy);
                assert!(!args.merge);
                assert!(!args.crop);
                assert!(args.tracks.is_empty());
                assert!(args.output_dir.is_none());
            }
            Commands::Probe(_) => panic!("expected export"),
        }
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_export_with_all_options() {
        let cli = Cli::parse_from([
            "powertrim",
            "--verbose",
            "export",
            "--input",
            "show.mkv",
            "--segment",
            "0-250",
            "--segment",
            "1000-1250",
            "--mode",
            "re-encode",
            "--merge",
            "--template",
            "{filename}_{num:03d}",
            "--tracks",
            "0,2,3",
            "--lang",
            "jpn,eng",
            "--crop",
            "--stop-on-error",
            "--ffmpeg",
            "/opt/ffmpeg",
        ]);
        assert!(cli.verbose);
        let Commands::Export(args) = cli.command else {
            panic!("expected export");
        };
        assert_eq!(args.segments.len(), 2);
        assert_eq!(ExportMode::from(args.mode), ExportMode::ReEncode);
        assert!(args.merge);
        assert_eq!(args.template.as_deref(), Some("{filename}_{num:03d}"));
        assert_eq!(args.tracks, vec![0, 2, 3]);
        assert_eq!(args.languages, vec!["jpn".to_string(), "eng".to_string()]);
        assert!(args.crop);
        assert!(args.stop_on_error);
        assert_eq!(args.tools.ffmpeg, Some(PathBuf::from("/opt/ffmpeg")));
    }

    #[test]
    fn test_job_file_conflicts_with_input() {
        let result = Cli::try_parse_from([
            "powertrim", "export", "--job", "job.json", "--input", "show.mkv",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let result = Cli::try_parse_from(["powertrim", "export", "-i", "a.mkv", "--mode", "h265"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_probe() {
        let cli = Cli::parse_from(["powertrim", "probe", "show.mkv", "--json"]);
        let Commands::Probe(args) = cli.command else {
            panic!("expected probe");
        };
        assert_eq!(args.input, PathBuf::from("show.mkv"));
        assert!(args.json);
    }
}
