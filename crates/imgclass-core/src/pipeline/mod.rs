//! Classification pipeline: context, decode, describe, infer, report.

mod backend;
mod batch;
mod context;
mod decoder;
mod descriptor;
mod invoker;
mod report;

pub use backend::create_backend;
pub use batch::{BatchSummary, CandidateFilter, FileOutcome, FileStatus, Pipeline};
pub use context::{AcceleratorContext, DeviceBuffer, MemoryStats};
pub use decoder::{ImageTensor, RasterDecoder};
pub use descriptor::{describe_input, describe_output};
pub use invoker::{infer, ScoreTensor};
pub use report::{argmax, ClassificationRecord, ReportWriter};
