//! Result classification of captured verification output.

use crate::pipeline::invoker::Invocation;
use crate::pipeline::types::VerificationStatus;

/// Marker the release check script prints for a failed signature or checksum.
pub const FAILURE_MARKER: &str = "BAD!!";

/// Classify raw script output: exact, case-sensitive substring match.
pub fn classify_output(output: &str) -> VerificationStatus {
    if output.contains(FAILURE_MARKER) {
        VerificationStatus::Bad
    } else {
        VerificationStatus::Good
    }
}

/// Classify a full invocation.
///
/// A reported failure marker always wins; otherwise a run that never
/// completed is `Error` rather than `Good`.
pub fn classify(invocation: &Invocation) -> VerificationStatus {
    match classify_output(&invocation.output) {
        VerificationStatus::Good if !invocation.completed => VerificationStatus::Error,
        status => status,
    }
}
