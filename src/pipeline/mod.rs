//! Release vote validation pipeline.
//!
//! Every admitted vote announcement flows through:
//! 1. `admission::admit()`: subject and body filtering
//! 2. `extract::extract_candidate()`: candidate id from the quoted command
//! 3. `RepositoryProbe::probe()`: staging repository existence check
//! 4. `VerificationInvoker::verify()`: external release check script
//! 5. `classify::classify()`: outcome from the captured output
//! 6. `artifacts::collect()`: staged files mirrored into the output tree
//!
//! `orchestrator::VoteCheckPipeline` composes the stages behind the host `Hook`.

pub mod admission;
pub mod artifacts;
pub mod classify;
pub mod extract;
pub mod invoker;
pub mod orchestrator;
pub mod probe;
pub mod render;
pub mod types;

pub use orchestrator::VoteCheckPipeline;
pub use types::{ArtifactSet, CandidateId, IncomingMessage, PipelineResult, VerificationStatus};
