//! Resolution of reference strings against compiled books.

mod index;

pub use index::{ReferenceIndex, Target};
