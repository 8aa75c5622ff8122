pub mod collection;
pub mod errors;
pub mod log;
pub mod status;

pub use collection::*;
pub use errors::*;
pub use log::*;
pub use status::*;
