// powertrim-cli/src/commands/probe.rs
//
// The `probe` command: prints what the export pipeline sees of a source.

use crate::cli::ProbeArgs;
use crate::logging;
use crate::terminal;
use crate::CliResult;

use anyhow::Context;
use powertrim_core::{
    CancellationToken, CommandFfprobeExecutor, FfprobeExecutor, Stream, ToolPaths, VideoMetadata,
    format_duration,
};

/// One row of the stream table.
pub fn format_stream(stream: &Stream) -> String {
    let mut row = format!(
        "#{:<3} {:<9} {}",
        stream.index,
        stream.kind.to_string(),
        stream.codec
    );
    if let Some(profile) = &stream.profile {
        row.push_str(&format!(" ({profile})"));
    }
    if let Some(language) = &stream.language {
        row.push_str(&format!(" [{language}]"));
    }
    if stream.default {
        row.push_str(" default");
    }
    if stream.forced {
        row.push_str(" forced");
    }
    row
}

fn print_metadata(metadata: &VideoMetadata) {
    terminal::print_section("Source");
    terminal::print_status("File", &metadata.path.display().to_string(), true);
    terminal::print_status("Container", &metadata.container, false);
    terminal::print_status("Duration", &format_duration(metadata.duration), false);
    terminal::print_status(
        "Frame rate",
        &format!("{} ({:.3} fps)", metadata.frame_rate, metadata.frame_rate.as_f64()),
        false,
    );
    terminal::print_status("Resolution", &metadata.resolution_label(), false);
    if metadata.is_hdr() {
        terminal::print_status("Dynamic range", "HDR", false);
    }
    if !metadata.supports_smart_cut() {
        terminal::print_status("Smart-cut", "unsupported (VP9 Profile 2/3)", false);
    }

    terminal::print_section("Streams");
    for stream in &metadata.streams {
        terminal::print_sub_item(&format_stream(stream));
    }
}

/// Runs the `probe` command.
pub fn run_probe(args: ProbeArgs, verbose: bool) -> CliResult<()> {
    logging::init_console(verbose)?;

    let mut tools = ToolPaths::default();
    args.tools.apply(&mut tools);

    let metadata = CommandFfprobeExecutor::new(&tools.ffprobe)
        .probe(&args.input, &CancellationToken::new())
        .with_context(|| format!("Failed to probe '{}'", args.input.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&metadata)?);
    } else {
        print_metadata(&metadata);
    }
    Ok(())
}
