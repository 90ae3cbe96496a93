// ============================================================================
// recast-cli/src/commands/transcode.rs
// ============================================================================
//
// TRANSCODE COMMAND: Wires the real tools into the core pipeline
//
// WORKFLOW:
// 1. Check that every input is a regular file
// 2. Verify ffprobe, ffmpeg and mkvpropedit
// 3. Resolve the encoders once, using the first input for probe encodes
//    (transcode and dry-run only)
// 4. Run the pipeline and print each input's result to stdout

// ---- Internal crate imports ----
use crate::error::{CliErrorContext, CliResult};

// ---- External crate imports ----
use console::{Term, style};
use recast_core::config::RunMode;
use recast_core::external::{
    CancellationToken, CommandFfprobeExecutor, FfmpegProgress, Mkvpropedit, SidecarSpawner,
    query_encoder_inventory, verify_dependencies,
};
use recast_core::{
    CoreError, CoreResult, FileOutcome, Pipeline, RunSummary, TranscodeConfig, format_duration,
    resolve_encoders,
};

// ---- Standard library imports ----
use std::cell::Cell;
use std::fs;
use std::path::PathBuf;

/// Fails with a usage error for the first input that is not a file.
pub fn check_inputs(inputs: &[PathBuf]) -> CliResult<()> {
    if inputs.is_empty() {
        return Err(CoreError::InvalidArgument("missing argument".to_string()));
    }
    for input in inputs {
        let metadata = fs::metadata(input)
            .map_err(|e| CoreError::InvalidArgument(e.to_string()))
            .cli_with_context(|| input.display())?;
        if !metadata.is_file() {
            return Err(CoreError::InvalidArgument(format!(
                "not a file: {}",
                input.display()
            )));
        }
    }
    Ok(())
}

/// Runs the configured mode over `inputs` with the installed tools.
pub fn run_transcode(
    config: &TranscodeConfig,
    inputs: &[PathBuf],
    cancel: CancellationToken,
) -> CliResult<RunSummary> {
    check_inputs(inputs)?;

    verify_dependencies()?;

    let spawner = SidecarSpawner;
    let encoders = match config.mode {
        RunMode::Transcode => {
            let inventory = query_encoder_inventory(&cancel)?;
            Some(resolve_encoders(
                config,
                &inventory,
                &spawner,
                &inputs[0],
                &cancel,
            )?)
        }
        RunMode::Scan | RunMode::PrintCrop | RunMode::PreviewCrop => None,
    };

    let ffprobe = CommandFfprobeExecutor::new(cancel.clone());
    let editor = Mkvpropedit::new(cancel.clone());

    let term = Term::stderr();
    let progress_shown = Cell::new(false);
    let show_progress = |progress: &FfmpegProgress| {
        let line = format!(
            "{} frame={} fps={:.1} bitrate={:.1}kbits/s speed={:.2}x",
            progress.time, progress.frame, progress.fps, progress.bitrate_kbps, progress.speed
        );
        if term.clear_line().and_then(|()| term.write_str(&line)).is_ok() {
            progress_shown.set(true);
        }
    };

    let mut pipeline = Pipeline::new(&spawner, &ffprobe, &editor, config, encoders, cancel);
    if term.is_term() && !config.debug {
        pipeline = pipeline.with_progress(&show_progress);
    }

    let summary = pipeline.run(inputs, |_, result| {
        if progress_shown.replace(false) {
            let _ = term.clear_line();
        }
        print_outcome(result);
    });

    print_summary(config, &summary);
    Ok(summary)
}

fn print_outcome(result: &CoreResult<FileOutcome>) {
    match result {
        Ok(FileOutcome::Scanned(lines)) | Ok(FileOutcome::Crop(lines)) => {
            for line in lines {
                println!("{line}");
            }
        }
        Ok(FileOutcome::DryRun(command)) => println!("{command}"),
        Ok(FileOutcome::Transcoded { output, elapsed }) => {
            println!(
                "{} {} ({})",
                style("Transcoded").green(),
                output.display(),
                format_duration(elapsed.as_secs_f64())
            );
        }
        // Already logged by the pipeline.
        Err(_) => {}
    }
}

fn print_summary(config: &TranscodeConfig, summary: &RunSummary) {
    if summary.cancelled {
        eprintln!("{}", style("Interrupted.").yellow());
    }
    if config.mode != RunMode::Transcode || config.dry_run || summary.failed == 0 {
        return;
    }
    eprintln!(
        "{} {} succeeded, {} failed",
        style("Summary:").bold(),
        summary.succeeded,
        style(summary.failed).red()
    );
}
