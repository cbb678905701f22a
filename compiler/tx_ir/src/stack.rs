//! Stack growth for deep expression trees.
//!
//! Binding, simplification and evaluation all recurse once per tree level.
//! Machine-generated rules (long `+` chains, nested `IF`s) can nest far deeper
//! than hand-written ones, so every recursive visitor wraps its step in
//! [`ensure_sufficient_stack`].
//!
//! - **Native targets**: `stacker` grows the stack on demand.
//! - **WASM targets**: passthrough.

/// Grow when less than this much stack remains.
const RED_ZONE: usize = 100 * 1024;

/// Size of each new stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first growing the stack if the remaining space is below the red zone.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_depth_does_not_overflow() {
        fn depth(n: u64) -> u64 {
            ensure_sufficient_stack(|| if n == 0 { 0 } else { depth(n - 1) + 1 })
        }

        assert_eq!(depth(100_000), 100_000);
    }
}
