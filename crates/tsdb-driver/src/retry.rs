//! Attempt-counting retry around one remote call.
//!
//! A budget of `N > 0` allows `N` attempts. Every failure whose
//! [`ErrorKind`](crate::error::ErrorKind) is retryable consumes one unit, with
//! no delay between attempts. When the budget runs out, the last failure is
//! wrapped in [`DriverError::OverRetry`]. Non-retryable failures return at
//! once, unwrapped. A budget of `0` runs the call once and returns whatever it
//! returns.

use std::future::Future;

use tracing::{error, warn};

use crate::error::{DriverError, Result};
use crate::uri::Endpoint;

pub async fn with_retries<T, F, Fut>(endpoint: Endpoint, budget: u32, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if budget == 0 {
        return call().await;
    }

    let mut remaining = budget;
    loop {
        match call().await {
            Ok(v) => return Ok(v),
            Err(e) if e.kind().is_retryable() => {
                remaining -= 1;
                let attempt = budget - remaining;
                if remaining == 0 {
                    error!("{endpoint} failed after {budget} attempts: {e}");
                    return Err(DriverError::OverRetry {
                        endpoint,
                        attempts: budget,
                        last: Box::new(e),
                    });
                }
                warn!("Transient {endpoint} error (attempt {attempt}/{budget}): {e}. Retrying...");
            }
            Err(e) => return Err(e),
        }
    }
}
