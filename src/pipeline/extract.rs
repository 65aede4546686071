//! Candidate id extraction from the vote announcement body.

use regex::Regex;

use crate::error::PipelineError;
use crate::pipeline::types::CandidateId;

/// Whether `body` quotes the release check command.
pub fn has_command(command: &Regex, body: &str) -> bool {
    command.is_match(body)
}

/// Extract the candidate id from the first release check command in `body`.
///
/// Callers are expected to have admitted the message first; a missing
/// command is reported as `PipelineError::MissingCommand`.
pub fn extract_candidate(command: &Regex, body: &str) -> Result<CandidateId, PipelineError> {
    let caps = command
        .captures(body)
        .ok_or(PipelineError::MissingCommand)?;
    let matched = caps
        .name("id")
        .or_else(|| caps.get(0))
        .map(|m| m.as_str())
        .unwrap_or_default();
    CandidateId::parse(&filter_digits(matched))
}

/// Keep only the ASCII digits of `s`.
pub fn filter_digits(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Patterns, VoteCheckConfig};

    fn command() -> Regex {
        Patterns::from_config(&VoteCheckConfig::default())
            .unwrap()
            .command
    }

    #[test]
    fn extracts_id_from_command() {
        let body = "Please vote.\n\nYou can use this UNIX script to download the release and verify the signatures:\nsh check_staged_release.sh 1234 /tmp/sling-staging\n\nThanks";
        assert_eq!(extract_candidate(&command(), body).unwrap().as_str(), "1234");
    }

    #[test]
    fn first_command_wins() {
        let body = "check_staged_release.sh 11 /tmp/sling-staging\ncheck_staged_release.sh 22 /tmp/sling-staging";
        assert_eq!(extract_candidate(&command(), body).unwrap().as_str(), "11");
    }

    #[test]
    fn missing_command_is_an_error() {
        let err = extract_candidate(&command(), "no command here").unwrap_err();
        assert!(matches!(err, PipelineError::MissingCommand));
        assert!(!has_command(&command(), "no command here"));
    }

    #[test]
    fn filter_digits_strips_everything_else() {
        assert_eq!(
            filter_digits("sh check_staged_release.sh 1234 /tmp/sling-staging"),
            "1234"
        );
        assert_eq!(filter_digits("no digits"), "");
    }

    #[test]
    fn filter_digits_is_idempotent() {
        let once = filter_digits("1234");
        assert_eq!(once, "1234");
        assert_eq!(filter_digits(&once), once);
    }
}
