//! Concurrent conversion of many recordings
//!
//! Each recording is converted on tokio's blocking pool by its own
//! [`ConversionPipeline`] and [`DirectorySink`], with at most `jobs` running at
//! once. A failing recording is reported and the batch moves on.
//!
//! ```rust,no_run
//! use arisfile::{BatchConverter, ConversionConfig};
//! use futures::StreamExt;
//!
//! # async fn demo() -> arisfile::Result<()> {
//! let converter = BatchConverter::new(ConversionConfig::default())?;
//! let mut progress = converter.progress();
//! tokio::spawn(async move {
//!     while let Some(p) = progress.next().await {
//!         println!("{}/{} files", p.files_done, p.files_total);
//!     }
//! });
//!
//! let report = converter.convert_dir("recordings/", "converted/").await?;
//! println!("{} failed", report.failed().count());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::pipeline::{ConversionPipeline, ConversionSummary};
use crate::sink::DirectorySink;
use crate::{ArisError, ConversionConfig, Result};

// Frame counts are republished at most this often while files are in flight.
const PROGRESS_PERIOD: Duration = Duration::from_millis(100);

/// Snapshot of batch progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchProgress {
    pub files_total: u64,
    /// Files finished, successfully or not
    pub files_done: u64,
    pub files_failed: u64,
    /// Frames decoded so far across all files
    pub frames_decoded: u64,
}

/// What happened to one input.
#[derive(Debug)]
pub enum FileOutcome {
    Converted(ConversionSummary),
    Failed(ArisError),
    /// Cancelled before the conversion started
    NotStarted,
}

#[derive(Debug)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub outcome: FileOutcome,
}

/// Per-file results, sorted by input path.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = (&FileReport, &ConversionSummary)> {
        self.files.iter().filter_map(|report| match &report.outcome {
            FileOutcome::Converted(summary) => Some((report, summary)),
            _ => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = (&FileReport, &ArisError)> {
        self.files.iter().filter_map(|report| match &report.outcome {
            FileOutcome::Failed(error) => Some((report, error)),
            _ => None,
        })
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }
}

struct ProgressCounters {
    files_total: u64,
    files_done: AtomicU64,
    files_failed: AtomicU64,
    frames_decoded: Arc<AtomicU64>,
    tx: watch::Sender<BatchProgress>,
}

impl ProgressCounters {
    fn new(files_total: u64, tx: watch::Sender<BatchProgress>) -> Self {
        let counters = Self {
            files_total,
            files_done: AtomicU64::new(0),
            files_failed: AtomicU64::new(0),
            frames_decoded: Arc::new(AtomicU64::new(0)),
            tx,
        };
        counters.publish();
        counters
    }

    fn record(&self, outcome: &FileOutcome) {
        if matches!(outcome, FileOutcome::Failed(_)) {
            self.files_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.files_done.fetch_add(1, Ordering::Relaxed);
        self.publish();
    }

    fn snapshot(&self) -> BatchProgress {
        BatchProgress {
            files_total: self.files_total,
            files_done: self.files_done.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
        }
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        self.tx.send_if_modified(|current| {
            let changed = *current != snapshot;
            *current = snapshot;
            changed
        });
    }
}

/// Republish progress every `period` until `done` is cancelled, so frame counts
/// move while long recordings are still converting.
fn spawn_progress_ticker(
    counters: Arc<ProgressCounters>,
    period: Duration,
    done: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = done.cancelled() => break,
                _ = interval.tick() => counters.publish(),
            }
        }
    })
}

struct PlannedJob {
    input: PathBuf,
    output: PathBuf,
    /// Earlier input that already owns `output`
    claimed_by: Option<PathBuf>,
}

/// Assign an output directory to every input, sorted by input path.
///
/// Inputs whose stems map to the same directory keep their full file name
/// instead (`run.aris/`, `run.ARIS/`). An input whose directory is still taken
/// after that is marked with the input that claimed it first.
fn plan_outputs(
    input_root: Option<&Path>,
    mut inputs: Vec<PathBuf>,
    output_dir: &Path,
) -> Vec<PlannedJob> {
    inputs.sort();
    let by_stem: Vec<PathBuf> =
        inputs.iter().map(|input| output_dir_for(input_root, input, output_dir)).collect();

    let mut stem_uses: HashMap<&Path, usize> = HashMap::new();
    for output in &by_stem {
        *stem_uses.entry(output.as_path()).or_default() += 1;
    }

    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
    inputs
        .into_iter()
        .zip(&by_stem)
        .map(|(input, stem_output)| {
            let shared = stem_uses.get(stem_output.as_path()).is_some_and(|&uses| uses > 1);
            let output = if shared {
                stem_output.with_file_name(input.file_name().unwrap_or(input.as_os_str()))
            } else {
                stem_output.clone()
            };
            let claimed_by = match claimed.entry(output.clone()) {
                Entry::Occupied(owner) => Some(owner.get().clone()),
                Entry::Vacant(slot) => {
                    slot.insert(input.clone());
                    None
                }
            };
            PlannedJob { input, output, claimed_by }
        })
        .collect()
}

/// Converts sets of recordings into per-recording output directories.
pub struct BatchConverter {
    config: ConversionConfig,
    cancel: CancellationToken,
    progress_tx: watch::Sender<BatchProgress>,
}

impl BatchConverter {
    pub fn new(config: ConversionConfig) -> Result<Self> {
        config.validate()?;
        let (progress_tx, _) = watch::channel(BatchProgress::default());
        Ok(Self { config, cancel: CancellationToken::new(), progress_tx })
    }

    /// Share a cancellation token with the caller, e.g. a Ctrl-C handler.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Progress updates. Yields the current snapshot first, then changes.
    pub fn progress(&self) -> impl Stream<Item = BatchProgress> + 'static {
        WatchStream::new(self.progress_tx.subscribe())
    }

    pub fn current_progress(&self) -> BatchProgress {
        *self.progress_tx.borrow()
    }

    /// Discover recordings under `input_dir` and convert each into
    /// `output_dir/<relative dir>/<file stem>/`, or `<file name>/` when stems clash.
    pub async fn convert_dir<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_dir: P,
        output_dir: Q,
    ) -> Result<BatchReport> {
        let input_dir = input_dir.as_ref();
        let inputs = discover_inputs(
            input_dir,
            self.config.normalized_extension(),
            self.config.recursive,
        )?;
        info!("Found {} recordings under {}", inputs.len(), input_dir.display());

        let jobs = plan_outputs(Some(input_dir), inputs, output_dir.as_ref());
        Ok(self.convert_jobs(jobs).await)
    }

    /// Convert the given recordings into `output_dir/<file stem>/`, or
    /// `<file name>/` when stems clash. Inputs that would still share an output
    /// directory fail with [`ArisError::OutputConflict`].
    pub async fn convert_files<Q: AsRef<Path>>(
        &self,
        inputs: Vec<PathBuf>,
        output_dir: Q,
    ) -> BatchReport {
        let jobs = plan_outputs(None, inputs, output_dir.as_ref());
        self.convert_jobs(jobs).await
    }

    async fn convert_jobs(&self, jobs: Vec<PlannedJob>) -> BatchReport {
        let counters = Arc::new(ProgressCounters::new(jobs.len() as u64, self.progress_tx.clone()));
        let ticker_done = CancellationToken::new();
        let ticker = spawn_progress_ticker(counters.clone(), PROGRESS_PERIOD, ticker_done.clone());

        let tasks = jobs.into_iter().map(|PlannedJob { input, output, claimed_by }| {
            let pipeline = ConversionPipeline::from_config(&self.config)
                .with_cancellation(self.cancel.clone())
                .with_frame_counter(counters.frames_decoded.clone());
            let write_rasters = self.config.write_rasters;
            let counters = counters.clone();

            async move {
                if let Some(claimed_by) = claimed_by {
                    let e = ArisError::OutputConflict {
                        output: output.clone(),
                        input: input.clone(),
                        claimed_by,
                    };
                    error!("Not converting {}: {}", input.display(), e);
                    let outcome = FileOutcome::Failed(e);
                    counters.record(&outcome);
                    return FileReport { input, output, outcome };
                }

                if pipeline.cancellation_token().is_cancelled() {
                    debug!("Skipping {} after cancellation", input.display());
                    return FileReport { input, output, outcome: FileOutcome::NotStarted };
                }

                let (task_input, task_output) = (input.clone(), output.clone());
                let joined = tokio::task::spawn_blocking(move || {
                    convert_one(&pipeline, &task_input, &task_output, write_rasters)
                })
                .await;

                let outcome = match joined {
                    Ok(Ok(summary)) => FileOutcome::Converted(summary),
                    Ok(Err(e)) => {
                        error!("Failed to convert {}: {}", input.display(), e);
                        FileOutcome::Failed(e)
                    }
                    Err(join_error) => {
                        error!("Conversion task for {} died: {}", input.display(), join_error);
                        FileOutcome::Failed(ArisError::io_error(
                            format!("conversion task for {}", input.display()),
                            std::io::Error::other(join_error),
                        ))
                    }
                };
                counters.record(&outcome);
                FileReport { input, output, outcome }
            }
        });

        let mut files: Vec<FileReport> =
            futures::stream::iter(tasks).buffer_unordered(self.config.jobs).collect().await;
        files.sort_by(|a, b| a.input.cmp(&b.input));

        ticker_done.cancel();
        if let Err(e) = ticker.await {
            debug!("Progress ticker ended abnormally: {}", e);
        }
        counters.publish();

        let report = BatchReport { files, cancelled: self.cancel.is_cancelled() };
        let progress = counters.snapshot();
        if report.has_failures() {
            warn!(
                "Batch finished with {} of {} files failed",
                progress.files_failed, progress.files_total
            );
        } else {
            info!(
                "Batch finished: {} files, {} frames decoded",
                progress.files_done, progress.frames_decoded
            );
        }
        report
    }
}

fn convert_one(
    pipeline: &ConversionPipeline,
    input: &Path,
    output: &Path,
    write_rasters: bool,
) -> Result<ConversionSummary> {
    // Reject unreadable headers before creating any output.
    ConversionPipeline::inspect_file(input)?;
    let mut sink = DirectorySink::create(output)?.with_rasters(write_rasters);
    pipeline.run_file(input, &mut sink)
}

/// Output directory for `input`: `output_dir`, then the input's directory
/// relative to `input_root` (when given), then the file stem.
pub fn output_dir_for(input_root: Option<&Path>, input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or(input.as_os_str());
    let relative = input_root
        .and_then(|root| input.parent()?.strip_prefix(root).ok())
        .unwrap_or(Path::new(""));
    output_dir.join(relative).join(stem)
}

/// List files under `root` whose extension matches `extension` case-insensitively,
/// sorted by path.
pub fn discover_inputs(root: &Path, extension: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    let extension = extension.trim_start_matches('.');
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|e| ArisError::file_error(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| ArisError::file_error(&dir, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| ArisError::file_error(&path, e))?;

            if file_type.is_dir() {
                if recursive {
                    pending.push(path);
                }
                continue;
            }

            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
            if matches {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        RecordingBuilder, corrupted_second_frame_recording, two_frame_recording, write_recording,
    };
    use anyhow::{Context, Result, ensure};

    fn config(jobs: usize) -> ConversionConfig {
        ConversionConfig { jobs, ..ConversionConfig::default() }
    }

    #[test]
    fn discovery_matches_extension_case_insensitively() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        write_recording(root, "b.aris", &[])?;
        write_recording(root, "a.ARIS", &[])?;
        write_recording(root, "notes.txt", &[])?;
        write_recording(&root.join("day2"), "c.aris", &[])?;

        let flat = discover_inputs(root, "aris", false)?;
        assert_eq!(flat, vec![root.join("a.ARIS"), root.join("b.aris")]);

        let deep = discover_inputs(root, ".aris", true)?;
        assert_eq!(
            deep,
            vec![root.join("a.ARIS"), root.join("b.aris"), root.join("day2").join("c.aris")]
        );
        Ok(())
    }

    #[test]
    fn discovery_reports_missing_root() {
        let result = discover_inputs(Path::new("/nonexistent/recordings"), "aris", false);
        assert!(matches!(result, Err(ArisError::File { .. })));
    }

    #[test]
    fn output_dirs_mirror_relative_layout() {
        let root = Path::new("/data/in");
        let out = Path::new("/data/out");
        assert_eq!(
            output_dir_for(Some(root), Path::new("/data/in/day1/run.aris"), out),
            Path::new("/data/out/day1/run")
        );
        assert_eq!(
            output_dir_for(None, Path::new("/data/in/day1/run.aris"), out),
            Path::new("/data/out/run")
        );
    }

    #[tokio::test]
    async fn one_bad_file_does_not_abort_the_batch() -> Result<()> {
        let input = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        write_recording(input.path(), "good.aris", &two_frame_recording())?;
        write_recording(input.path(), "skips.aris", &corrupted_second_frame_recording())?;
        write_recording(
            input.path(),
            "zz_bad.aris",
            &RecordingBuilder::new().file_version(7).frame(0, 1, 10).build(),
        )?;

        let converter = BatchConverter::new(config(2))?;
        let report = converter.convert_dir(input.path(), output.path()).await?;

        assert_eq!(report.files.len(), 3);
        assert_eq!(report.succeeded().count(), 2);
        let (failed, error) = report.failed().next().context("Expected one failure")?;
        assert_eq!(failed.input, input.path().join("zz_bad.aris"));
        ensure!(matches!(error, ArisError::BadMagic { found: 7, .. }), "Got {:?}", error);
        ensure!(!failed.output.exists(), "No output for a rejected header");

        ensure!(output.path().join("good/summary.yaml").is_file(), "good.aris not converted");
        ensure!(output.path().join("skips/skips.yaml").is_file(), "skips.aris not converted");

        let progress = converter.current_progress();
        assert_eq!(
            progress,
            BatchProgress { files_total: 3, files_done: 3, files_failed: 1, frames_decoded: 3 }
        );
        Ok(())
    }

    #[tokio::test]
    async fn progress_stream_reports_latest_snapshot() -> Result<()> {
        let input = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        let files = vec![
            write_recording(input.path(), "one.aris", &two_frame_recording())?,
            write_recording(input.path(), "two.aris", &two_frame_recording())?,
        ];

        let converter = BatchConverter::new(config(1))?;
        let mut progress = converter.progress();
        let report = converter.convert_files(files, output.path()).await;
        ensure!(!report.has_failures(), "Both files are valid");

        let latest = progress.next().await.context("Progress stream ended")?;
        assert_eq!(latest.files_done, 2);
        assert_eq!(latest.frames_decoded, 4);
        Ok(())
    }

    #[tokio::test]
    async fn cancelled_batch_starts_nothing() -> Result<()> {
        let input = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        write_recording(input.path(), "one.aris", &two_frame_recording())?;

        let token = CancellationToken::new();
        token.cancel();
        let converter = BatchConverter::new(config(1))?.with_cancellation(token);
        let report = converter.convert_dir(input.path(), output.path()).await?;

        ensure!(report.cancelled, "Report should record cancellation");
        ensure!(
            matches!(report.files[0].outcome, FileOutcome::NotStarted),
            "Got {:?}",
            report.files[0].outcome
        );
        ensure!(!output.path().join("one").exists(), "Nothing should be written");
        Ok(())
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = BatchConverter::new(ConversionConfig { jobs: 0, ..ConversionConfig::default() });
        assert!(matches!(result, Err(ArisError::Config { .. })));
    }

    fn frame_documents(dir: &Path) -> Result<usize> {
        let mut count = 0;
        for entry in std::fs::read_dir(dir.join("frames"))
            .with_context(|| format!("Listing frames under {}", dir.display()))?
        {
            if entry?.path().extension().is_some_and(|ext| ext == "yaml") {
                count += 1;
            }
        }
        Ok(count)
    }

    fn frames(count: u32) -> Vec<u8> {
        let mut builder = RecordingBuilder::new();
        for index in 0..count {
            builder = builder.frame(index, 1, 4);
        }
        builder.build()
    }

    #[tokio::test]
    async fn clashing_stems_keep_their_extension() -> Result<()> {
        let input = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        write_recording(input.path(), "run.aris", &frames(3))?;
        write_recording(input.path(), "run.ARIS", &frames(1))?;

        let report =
            BatchConverter::new(config(1))?.convert_dir(input.path(), output.path()).await?;

        ensure!(!report.has_failures(), "Both recordings should convert: {:?}", report.files);
        assert_eq!(report.files[0].output, output.path().join("run.ARIS"));
        assert_eq!(report.files[1].output, output.path().join("run.aris"));
        assert_eq!(frame_documents(&output.path().join("run.ARIS"))?, 1);
        assert_eq!(frame_documents(&output.path().join("run.aris"))?, 3);
        ensure!(!output.path().join("run").exists(), "Stem directory should not be shared");
        Ok(())
    }

    #[tokio::test]
    async fn same_file_name_in_two_folders_is_a_conflict() -> Result<()> {
        let input = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        let first = write_recording(&input.path().join("a"), "run.aris", &frames(2))?;
        let second = write_recording(&input.path().join("b"), "run.aris", &frames(1))?;

        let report = BatchConverter::new(config(2))?
            .convert_files(vec![second.clone(), first.clone()], output.path())
            .await;

        assert_eq!(report.succeeded().count(), 1);
        let (failed, error) = report.failed().next().context("Second input should fail")?;
        assert_eq!(failed.input, second);
        match error {
            ArisError::OutputConflict { claimed_by, .. } => assert_eq!(claimed_by, &first),
            other => anyhow::bail!("Expected OutputConflict, got {:?}", other),
        }
        assert_eq!(frame_documents(&output.path().join("run.aris"))?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn progress_ticker_publishes_frames_before_files_finish() -> Result<()> {
        let (tx, rx) = watch::channel(BatchProgress::default());
        let counters = Arc::new(ProgressCounters::new(1, tx));
        let done = CancellationToken::new();
        let ticker =
            spawn_progress_ticker(counters.clone(), Duration::from_millis(5), done.clone());

        counters.frames_decoded.fetch_add(7, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let progress = *rx.borrow();
        assert_eq!(progress.frames_decoded, 7);
        assert_eq!(progress.files_done, 0);

        done.cancel();
        ticker.await?;
        Ok(())
    }
}
