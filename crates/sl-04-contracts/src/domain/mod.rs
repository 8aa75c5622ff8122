pub mod commit;
pub mod config;
pub mod contract;
pub mod dvp;
pub mod entries;
pub mod errors;
pub mod events;
pub mod exchange;
pub mod nominate;
pub mod signing;
pub mod snapshot;
pub mod tx;

pub use commit::*;
pub use config::*;
pub use contract::*;
pub use dvp::*;
pub use entries::*;
pub use errors::*;
pub use events::*;
pub use exchange::*;
pub use nominate::*;
pub use snapshot::*;
pub use tx::*;
