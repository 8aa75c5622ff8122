pub mod address;
pub mod asset;
pub mod entry;

pub use address::*;
pub use asset::*;
pub use entry::*;
