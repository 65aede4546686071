//! Admission rules: decides whether a message is a vote announcement
//! worth validating.
//!
//! A message is admitted when:
//! - the subject is not a release announcement (`[RELEASE]`, `RELEASE]`)
//! - the subject is not a reply (`re:`, any case)
//! - the body quotes the release check command
//!
//! Pure and side-effect free; safe to call repeatedly.

use regex::Regex;
use tracing::debug;

use crate::pipeline::extract::has_command;
use crate::pipeline::types::IncomingMessage;

/// Subject markers of a release announcement (already released, nothing to check).
const RELEASE_MARKERS: &[&str] = &["[RELEASE]", "RELEASE]"];

/// Lower-cased reply marker.
const REPLY_MARKER: &str = "re:";

/// Why a message was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    ReleaseAnnouncement,
    Reply,
    NoCommand,
}

/// Evaluate the admission rules, returning the first rule that rejects.
pub fn evaluate(command: &Regex, message: &IncomingMessage) -> Option<Rejection> {
    if RELEASE_MARKERS.iter().any(|m| message.subject.contains(m)) {
        return Some(Rejection::ReleaseAnnouncement);
    }
    if message.subject.to_lowercase().contains(REPLY_MARKER) {
        return Some(Rejection::Reply);
    }
    if !has_command(command, &message.full_body) {
        return Some(Rejection::NoCommand);
    }
    None
}

/// Whether `message` should be processed.
pub fn admit(command: &Regex, message: &IncomingMessage) -> bool {
    match evaluate(command, message) {
        Some(rejection) => {
            debug!(subject = %message.subject, ?rejection, "Message not admitted");
            false
        }
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Patterns, VoteCheckConfig};

    const BODY: &str = "Staging repo ready.\nsh check_staged_release.sh 1234 /tmp/sling-staging\n";

    fn command() -> Regex {
        Patterns::from_config(&VoteCheckConfig::default())
            .unwrap()
            .command
    }

    #[test]
    fn admits_vote_with_command() {
        let msg = IncomingMessage::new("[VOTE] Release Foo 1.0", BODY);
        assert!(admit(&command(), &msg));
    }

    #[test]
    fn rejects_release_announcement_regardless_of_body() {
        let msg = IncomingMessage::new("[RELEASE] Apache Foo 1.0", BODY);
        assert_eq!(
            evaluate(&command(), &msg),
            Some(Rejection::ReleaseAnnouncement)
        );

        let msg = IncomingMessage::new("[ANN][RELEASE] Apache Foo 1.0", BODY);
        assert!(!admit(&command(), &msg));
    }

    #[test]
    fn rejects_partial_release_marker() {
        let msg = IncomingMessage::new("[ANN RELEASE] Apache Foo 1.0", BODY);
        assert_eq!(
            evaluate(&command(), &msg),
            Some(Rejection::ReleaseAnnouncement)
        );
    }

    #[test]
    fn rejects_replies_case_insensitively() {
        for subject in ["Re: [VOTE] Release Foo 1.0", "RE: [VOTE] Release Foo 1.0"] {
            let msg = IncomingMessage::new(subject, BODY);
            assert_eq!(evaluate(&command(), &msg), Some(Rejection::Reply));
        }
    }

    #[test]
    fn rejects_without_command() {
        let msg = IncomingMessage::new("[VOTE] Release Foo 1.0", "Please vote!");
        assert_eq!(evaluate(&command(), &msg), Some(Rejection::NoCommand));
    }

    #[test]
    fn admission_is_repeatable() {
        let msg = IncomingMessage::new("[VOTE] Release Foo 1.0", BODY);
        let cmd = command();
        assert_eq!(admit(&cmd, &msg), admit(&cmd, &msg));
    }
}
