/// Errors from [`BindToTwins::bind_all`](crate::BindToTwins::bind_all).
///
/// Failing to resolve a name is not an error: it becomes a `FAILED` node in
/// the bound tree and clears the binder's success flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("binding cancelled after {completed} expressions")]
    Cancelled { completed: usize },
}
