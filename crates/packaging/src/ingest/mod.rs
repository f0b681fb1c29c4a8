//! Built-in ingesters.

mod binary;
mod entry;
mod mets;
mod zip;

#[cfg(test)]
pub(crate) use self::zip::build_zip;

pub use self::binary::BinaryIngester;
pub use self::entry::EntryIngester;
pub use self::mets::MetsIngester;
pub use self::zip::SimpleZipIngester;
