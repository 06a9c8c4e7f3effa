mod array;
mod column;
mod doc;
mod elements;
mod object;
pub mod path;
mod resolve;
pub mod rewrite;
mod revision;
pub mod skip;
mod update;

pub use array::{ArrayInserter, ArrayIter};
pub use column::{ColumnIter, ColumnValues, ColumnWrite};
pub use doc::Document;
pub use elements::IterState;
pub use object::{ObjectInserter, ObjectIter};
pub use path::{DotPath, PathNode, ToDotPath};
pub use resolve::{PathPosition, PathStatus, Resolved, resolve};
pub use revision::Revision;

#[cfg(test)]
mod tests;
