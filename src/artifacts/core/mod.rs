//! Cancellation and error plumbing shared by all walkers
//!
//! Every recursive walker (tree filtering, expansion passes, in-flight
//! build, history driver) checks a cooperative cancellation token at the
//! top of each iteration. A cancellation error is propagated verbatim all
//! the way out: it is never wrapped with operational context, so callers
//! can always tell cancellation apart from failure.

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Error signalling that a walker observed a cancelled token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Return a cancellation error if the token has been triggered
pub fn ensure_not_cancelled(cancel: &CancellationToken) -> anyhow::Result<()> {
    if cancel.is_cancelled() {
        Err(anyhow::Error::new(Cancelled))
    } else {
        Ok(())
    }
}

/// Check whether an error (anywhere in its chain) is a cancellation
pub fn is_cancellation(err: &anyhow::Error) -> bool {
    err.is::<Cancelled>()
}

/// Attach operational context to an error unless it is a cancellation
///
/// Cancellation errors pass through unchanged.
pub fn wrap_unless_cancelled(
    err: anyhow::Error,
    context: impl FnOnce() -> String,
) -> anyhow::Error {
    if is_cancellation(&err) {
        err
    } else {
        err.context(context())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_passes_the_check() {
        let cancel = CancellationToken::new();
        assert!(ensure_not_cancelled(&cancel).is_ok());
    }

    #[test]
    fn cancelled_token_fails_the_check() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = ensure_not_cancelled(&cancel).unwrap_err();
        assert!(is_cancellation(&err));
    }

    #[test]
    fn wrapping_skips_cancellation_errors() {
        let err = anyhow::Error::new(Cancelled);
        let wrapped = wrap_unless_cancelled(err, || "while doing work".to_string());

        // no context added, the message is still the bare cancellation
        assert_eq!(wrapped.to_string(), "operation cancelled");
        assert!(is_cancellation(&wrapped));
    }

    #[test]
    fn wrapping_adds_context_to_other_errors() {
        let err = anyhow::anyhow!("disk on fire");
        let wrapped = wrap_unless_cancelled(err, || "while doing work".to_string());

        assert_eq!(wrapped.to_string(), "while doing work");
        assert!(!is_cancellation(&wrapped));
    }

    #[test]
    fn cancellation_survives_context_wrapping_by_callers() {
        let err = anyhow::Error::new(Cancelled).context("outer layer");
        assert!(is_cancellation(&err));
    }
}
