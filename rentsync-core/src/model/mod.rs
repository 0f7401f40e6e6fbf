//! Rows of the managed datastore that the engine reads and writes.

mod calendar;
mod subscription;
mod token;

pub use calendar::*;
pub use subscription::*;
pub use token::*;
