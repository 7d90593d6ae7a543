//! Flat path listings ⇄ browsable hierarchy.
//!
//! The remote only lists paths. `build` turns such a listing into nested
//! [`TreeNode`](crate::domain::TreeNode)s, ordered directories first and
//! then files, case-insensitively by name at every level. `flatten` walks a
//! hierarchy back into paths.

mod build;
mod flatten;
mod render;

pub use build::build;
pub use flatten::flatten;
pub use render::render;
