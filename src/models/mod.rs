//! Data models for the forum.
//!
//! Wire names are camelCase to match the web client.

mod comment;
mod page;
mod post;
mod share;
mod user;
mod vote;

pub use comment::*;
pub use page::*;
pub use post::*;
pub use share::*;
pub use user::*;
pub use vote::*;
