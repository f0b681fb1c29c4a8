//! Built-in disseminators.

mod feed;
mod zip;

pub use self::feed::FeedDisseminator;
pub use self::zip::ZipDisseminator;
