//! Text renderings of twin expressions.
//!
//! - [`serialize`]: canonical, minimally parenthesized source text that
//!   parses back to an equal tree
//! - [`describe`]: an English sentence for rule summaries, in metric or
//!   imperial units
//!
//! The fully parenthesized diagnostic form is `Expr`'s `Display` impl.

mod describe;
mod serialize;

pub use describe::describe;
pub use serialize::{is_simple_identifier, serialize, Serializer};
