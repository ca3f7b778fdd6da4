//! Cooperative cancellation for stream handles (§5).

use tokio_util::sync::CancellationToken;

use super::types::ChatStream;

/// A handle that requests cancellation of the stream it was produced for.
///
/// Dropping the wrapped stream (without calling [`CancelHandle::cancel`])
/// still releases the underlying HTTP body, since the stream's own `Drop`
/// closes its connection; `cancel()` additionally wakes a task that's
/// currently blocked waiting on the next chunk.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    fn new() -> Self {
        Self { token: CancellationToken::new() }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancelled(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

pub fn new_cancel_handle() -> CancelHandle {
    CancelHandle::new()
}

/// Wrap `stream` so that calling `cancel()` on the returned handle makes it
/// terminate (returning `None` on its next poll) instead of waiting on the
/// underlying transport.
pub fn make_cancellable_stream(stream: ChatStream) -> (ChatStream, CancelHandle) {
    let handle = CancelHandle::new();
    let token = handle.token.clone();
    let mut inner = stream;
    let s = async_stream::stream! {
        use futures::StreamExt;
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                item = inner.next() => {
                    let Some(item) = item else { break };
                    yield item;
                }
            }
        }
    };
    (Box::pin(s), handle)
}
