pub mod config;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod progress;
pub mod provider;
pub mod registry;
pub mod settings;
pub mod splitter;
pub mod subtitle;
pub mod text;
pub mod verbose;

pub use config::{OutputFormat, TranscriptionModel};
pub use error::{Result, ScribeError};
pub use http::get_http_client;
pub use pipeline::{
    INLINE_AUDIO_BYTES_THRESHOLD, PipelineInput, TranscriptionOutcome, run_transcription,
};
pub use progress::{NullSink, Phase, ProgressSink, ProgressStatus, ProgressUpdate};
pub use provider::{GeminiBackend, TranscriptionBackend, TranscriptionRequest};
pub use registry::{
    JobCompletion, JobEvent, JobFailure, JobRegistry, JobStatus, JobSubscription, RegistrySink,
};
pub use settings::Settings;
pub use splitter::{AudioSegments, split_audio_file};
pub use subtitle::build_approximate_srt;
pub use text::strip_code_fences;
pub use verbose::{is_verbose, set_verbose};
