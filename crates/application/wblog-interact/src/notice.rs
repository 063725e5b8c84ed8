//! Transient user notices (toasts)

use tokio::sync::mpsc;
use tracing::debug;
use wblog_core::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Sending half of the notice channel; cheap to clone
#[derive(Debug, Clone)]
pub struct Notices {
    tx: mpsc::UnboundedSender<Notice>,
}

/// Create a notice channel
pub fn notices() -> (Notices, mpsc::UnboundedReceiver<Notice>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Notices { tx }, rx)
}

impl Notices {
    fn push(&self, level: NoticeLevel, message: String) {
        // Nobody listening is fine
        if self.tx.send(Notice { level, message }).is_err() {
            debug!("notice dropped, receiver closed");
        }
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(NoticeLevel::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message.into());
    }

    /// Report a failed operation: validation details verbatim, `fallback`
    /// for anything generic.
    pub fn failure(&self, error: &Error, fallback: &str) {
        debug!(error = %error, "operation failed");
        self.error(error.user_message(fallback));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_messages() {
        let (notices, mut rx) = notices();

        notices.failure(&Error::Network("reset".to_string()), "Failed to update like");
        notices.failure(
            &Error::Api {
                status: 400,
                detail: "Already liked".to_string(),
            },
            "Failed to update like",
        );
        notices.success("Post bookmarked");

        assert_eq!(rx.try_recv().unwrap().message, "Failed to update like");
        assert_eq!(rx.try_recv().unwrap().message, "Already liked");
        let last = rx.try_recv().unwrap();
        assert_eq!(last.level, NoticeLevel::Success);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_receiver_is_ignored() {
        let (notices, rx) = notices();
        drop(rx);
        notices.success("nobody hears this");
    }
}
