//! Command-line entry point: batch analysis of GPX files and the
//! structural inspection dump.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use walkdir::WalkDir;

use gpx_cadence::{
    analyze_intervals, extract_waypoints, inspect_document, write_batch_summary, write_markdown,
    write_report, write_summary, AnalysisConfig, AnalysisResult,
};

#[derive(Parser, Debug)]
#[command(
    name = "gpx-cadence",
    version,
    about = "Analyze GPX files for waypoint interval anomalies"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze one or more GPX files for recording-cadence anomalies
    Analyze(AnalyzeArgs),
    /// Dump raw structural facts about GPX files for manual debugging
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct AnalyzeArgs {
    /// GPX file, directory, or glob pattern
    path: String,

    /// Recursively search directories for GPX files
    #[arg(short, long)]
    recursive: bool,

    /// Gap threshold in seconds; longer intervals are flagged
    #[arg(short = 't', long, default_value_t = 120.0)]
    threshold: f64,

    /// Minimum expected interval in seconds; shorter positive intervals are flagged
    #[arg(long, default_value_t = 0.5)]
    min_interval: f64,

    /// Show a detailed per-interval listing
    #[arg(short, long)]
    verbose: bool,

    /// Save a markdown report to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit results as JSON instead of the text report
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// GPX files to inspect
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Analyze(args) => analyze_command(&args),
        Command::Inspect(args) => inspect_command(&args),
    }
}

fn is_gpx(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("gpx"))
        .unwrap_or(false)
}

/// Resolve the path argument to the list of GPX files to analyze: a single
/// file, a directory scan, or a glob pattern.
fn collect_gpx_files(arg: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    let path = Path::new(arg);

    if path.is_file() {
        if !is_gpx(path) {
            bail!("{} is not a GPX file", path.display());
        }
        return Ok(vec![path.to_path_buf()]);
    }

    if path.is_dir() {
        let walker = if recursive {
            WalkDir::new(path)
        } else {
            WalkDir::new(path).max_depth(1)
        };
        let mut files: Vec<PathBuf> = walker
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|p| is_gpx(p))
            .collect();
        files.sort();
        if files.is_empty() {
            bail!("no GPX files found in {}", path.display());
        }
        return Ok(files);
    }

    // Neither file nor directory: treat the argument as a glob pattern
    let files: Vec<PathBuf> = glob::glob(arg)
        .with_context(|| format!("invalid glob pattern: {arg}"))?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();
    if files.is_empty() {
        bail!("no files match pattern: {arg}");
    }
    Ok(files)
}

fn analyze_file(path: &Path, config: &AnalysisConfig) -> gpx_cadence::Result<AnalysisResult> {
    let waypoints = extract_waypoints(path)?;
    Ok(analyze_intervals(
        &path.display().to_string(),
        &waypoints,
        config,
    ))
}

/// Analyze every file, isolating failures per file. With the `parallel`
/// feature the batch fans out across cores; result order always follows
/// input order so each report stays attributed to its file.
#[cfg(feature = "parallel")]
fn run_batch(
    files: &[PathBuf],
    config: &AnalysisConfig,
) -> Vec<gpx_cadence::Result<AnalysisResult>> {
    use rayon::prelude::*;
    files
        .par_iter()
        .map(|path| analyze_file(path, config))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn run_batch(
    files: &[PathBuf],
    config: &AnalysisConfig,
) -> Vec<gpx_cadence::Result<AnalysisResult>> {
    files.iter().map(|path| analyze_file(path, config)).collect()
}

fn analyze_command(args: &AnalyzeArgs) -> Result<()> {
    let files = collect_gpx_files(&args.path, args.recursive)?;
    let config = AnalysisConfig {
        gap_threshold_seconds: args.threshold,
        min_interval_seconds: args.min_interval,
    };

    let outcomes = run_batch(&files, &config);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut results = Vec::new();
    for (path, outcome) in files.iter().zip(outcomes) {
        match outcome {
            Ok(result) => {
                if !args.json {
                    write_report(&mut out, &result, args.verbose)?;
                }
                results.push(result);
            }
            // A failed file never aborts the batch
            Err(e) => eprintln!("Error analyzing {}: {e}", path.display()),
        }
    }

    if results.is_empty() {
        bail!("no files could be analyzed");
    }

    if args.json {
        serde_json::to_writer_pretty(&mut out, &results)?;
        writeln!(out)?;
    } else if results.len() > 1 {
        write_batch_summary(&mut out, &results)?;
    }

    if let Some(output) = &args.output {
        let mut file = File::create(output)
            .with_context(|| format!("cannot write report to {}", output.display()))?;
        write_markdown(&mut file, &results)?;
        writeln!(out, "\nReport saved to: {}", output.display())?;
    }

    Ok(())
}

fn inspect_command(args: &InspectArgs) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut inspected = 0usize;
    for path in &args.files {
        match inspect_document(path) {
            Ok(summary) => {
                write_summary(&mut out, &summary)?;
                inspected += 1;
            }
            Err(e) => eprintln!("Error inspecting {}: {e}", path.display()),
        }
    }

    if inspected == 0 {
        bail!("no files could be inspected");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::write(path, "<gpx/>").unwrap();
    }

    #[test]
    fn test_is_gpx() {
        assert!(is_gpx(Path::new("track.gpx")));
        assert!(is_gpx(Path::new("track.GPX")));
        assert!(!is_gpx(Path::new("track.fit")));
        assert!(!is_gpx(Path::new("track")));
    }

    #[test]
    fn test_collect_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.gpx");
        touch(&file);

        let files = collect_gpx_files(file.to_str().unwrap(), false).unwrap();
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn test_collect_rejects_non_gpx_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.fit");
        touch(&file);

        let err = collect_gpx_files(file.to_str().unwrap(), false).unwrap_err();
        assert!(err.to_string().contains("not a GPX file"));
    }

    #[test]
    fn test_collect_directory_non_recursive() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.gpx"));
        touch(&dir.path().join("a.gpx"));
        touch(&dir.path().join("notes.txt"));
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        touch(&dir.path().join("nested").join("c.gpx"));

        let files = collect_gpx_files(dir.path().to_str().unwrap(), false).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.gpx", "b.gpx"]);
    }

    #[test]
    fn test_collect_directory_recursive() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.gpx"));
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        touch(&dir.path().join("nested").join("c.gpx"));

        let files = collect_gpx_files(dir.path().to_str().unwrap(), true).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_collect_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect_gpx_files(dir.path().to_str().unwrap(), false).unwrap_err();
        assert!(err.to_string().contains("no GPX files found"));
    }

    #[test]
    fn test_collect_glob_pattern() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.gpx"));
        touch(&dir.path().join("b.gpx"));

        let pattern = format!("{}/*.gpx", dir.path().display());
        let files = collect_gpx_files(&pattern, false).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_collect_unmatched_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.gpx", dir.path().display());
        let err = collect_gpx_files(&pattern, false).unwrap_err();
        assert!(err.to_string().contains("no files match pattern"));
    }
}
