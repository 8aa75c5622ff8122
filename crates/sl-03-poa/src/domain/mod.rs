pub mod entry;
pub mod errors;
pub mod group;
pub mod item;
pub mod permissions;
pub mod rules;

pub use entry::*;
pub use errors::*;
pub use group::*;
pub use item::*;
pub use permissions::*;
pub use rules::*;
