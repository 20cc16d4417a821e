//! Batch orchestration: candidate selection and the per-file pipeline.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use imgclass_inference::InferenceBackend;

use crate::error::{ClassifyError, Result};
use crate::models::config::{BatchConfig, ClassifyConfig};

use super::backend::create_backend;
use super::context::{AcceleratorContext, MemoryStats};
use super::decoder::RasterDecoder;
use super::descriptor::{describe_input, describe_output};
use super::invoker::infer;
use super::report::ReportWriter;

/// Decides which directory entries are candidate images.
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    extensions: Vec<String>,
    case_sensitive: bool,
}

impl CandidateFilter {
    pub fn new<S: Into<String>>(extensions: impl IntoIterator<Item = S>, case_sensitive: bool) -> Self {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
            case_sensitive,
        }
    }

    pub fn from_config(config: &BatchConfig) -> Self {
        Self::new(config.extensions.iter().cloned(), config.case_sensitive)
    }

    /// Whether `path` carries one of the candidate extensions.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions.iter().any(|candidate| {
            if self.case_sensitive {
                candidate == ext
            } else {
                candidate.eq_ignore_ascii_case(ext)
            }
        })
    }

    /// Candidate files directly inside `dir`, sorted by path.
    pub fn list(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut candidates = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && self.matches(&path) {
                candidates.push(path);
            } else {
                debug!("Skipping {}", path.display());
            }
        }
        candidates.sort();
        Ok(candidates)
    }
}

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    Classified { predicted_class: Option<usize> },
    Failed { error: String },
}

/// Outcome of one candidate file.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
    pub elapsed: Duration,
}

/// Per-file outcomes of a completed batch, in processing order.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchSummary {
    pub fn classified(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, FileStatus::Classified { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.classified()
    }
}

/// The batch classification pipeline.
///
/// Owns the accelerator context for the whole run and drives each candidate
/// through decode, describe, infer and report, one file at a time. Every
/// device buffer of a file is released before the next file starts.
pub struct Pipeline<B: InferenceBackend> {
    ctx: AcceleratorContext<B>,
    decoder: RasterDecoder,
    filter: CandidateFilter,
    class_count: usize,
    continue_on_error: bool,
}

impl Pipeline<Box<dyn InferenceBackend>> {
    /// Validate `config`, build its backend and acquire the device.
    pub fn from_config(config: &ClassifyConfig) -> Result<Self> {
        config.validate()?;
        let backend = create_backend(&config.model)?;
        Self::with_backend(backend, config)
    }
}

impl<B: InferenceBackend> Pipeline<B> {
    /// Acquire the device for an already constructed backend.
    pub fn with_backend(backend: B, config: &ClassifyConfig) -> Result<Self> {
        config.validate()?;
        let ctx = AcceleratorContext::acquire(backend, &config.device)?;

        Ok(Self {
            ctx,
            decoder: RasterDecoder::new().with_max_image_bytes(config.decoder.max_image_bytes),
            filter: CandidateFilter::from_config(&config.batch),
            class_count: config.model.class_count,
            continue_on_error: config.batch.continue_on_error,
        })
    }

    pub fn context(&self) -> &AcceleratorContext<B> {
        &self.ctx
    }

    /// Candidate files in `dir`, in the order they will be processed.
    pub fn candidates(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        self.filter.list(dir)
    }

    /// Classify `candidates` in order, appending to `report`.
    ///
    /// By default the first per-file failure aborts the batch; records
    /// already written are flushed and left in place. With
    /// `continue_on_error`, decode and inference failures become error
    /// records and the batch moves on. Report write failures are always
    /// fatal.
    pub fn run<W: Write>(
        &self,
        candidates: &[PathBuf],
        report: &mut ReportWriter<W>,
        mut on_file: impl FnMut(&FileOutcome),
    ) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();

        for path in candidates {
            let start = Instant::now();
            let status = match self.process_file(path, report) {
                Ok(predicted_class) => FileStatus::Classified { predicted_class },
                Err(e) if self.continue_on_error && e.is_per_file() => {
                    warn!("Skipping {}: {}", path.display(), e);
                    report.report_error(&path.display().to_string(), &e)?;
                    FileStatus::Failed {
                        error: e.to_string(),
                    }
                }
                Err(e) => {
                    error!("Aborting batch at {}: {}", path.display(), e);
                    if let Err(flush_err) = report.flush() {
                        warn!("Could not flush partial report: {}", flush_err);
                    }
                    return Err(e);
                }
            };

            let outcome = FileOutcome {
                path: path.clone(),
                status,
                elapsed: start.elapsed(),
            };
            on_file(&outcome);
            summary.outcomes.push(outcome);
        }

        report.flush()?;
        info!(
            "Batch finished: {} classified, {} failed",
            summary.classified(),
            summary.failed()
        );
        Ok(summary)
    }

    fn process_file<W: Write>(
        &self,
        path: &Path,
        report: &mut ReportWriter<W>,
    ) -> Result<Option<usize>> {
        let image = self.decoder.decode(path).map_err(|source| ClassifyError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

        let input_desc = describe_input(&self.ctx, image.height() as usize, image.width() as usize);
        let output_desc = describe_output(&self.ctx, self.class_count);

        let scores = infer(&self.ctx, image, &input_desc, &output_desc, self.class_count)
            .map_err(|source| ClassifyError::Inference {
                path: path.to_path_buf(),
                source,
            })?;

        let predicted = report.report(&path.display().to_string(), &scores)?;
        debug!("{} -> class {:?}", path.display(), predicted);
        Ok(predicted)
    }

    /// Release the accelerator context.
    pub fn shutdown(self) -> MemoryStats {
        self.ctx.release()
    }
}
