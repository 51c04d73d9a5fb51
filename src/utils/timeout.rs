//! Async timeout helpers.

use std::future::Future;
use std::time::Duration;

use crate::error::{ProtocolError, Result};

/// Run `fut`, failing with [`ProtocolError::ConnectionTimeout`] if it takes longer than `duration`
pub async fn with_timeout_error<F, T>(fut: F, duration: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProtocolError::ConnectionTimeout),
    }
}

/// Like [`with_timeout_error`], but `None` waits forever
pub async fn maybe_timeout<F, T>(fut: F, duration: Option<Duration>) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match duration {
        Some(duration) => with_timeout_error(fut, duration).await,
        None => fut.await,
    }
}
