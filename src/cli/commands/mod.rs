//! CLI command implementations

pub mod config;
pub mod get;
pub mod prefetch;
pub mod reset;
pub mod status;
pub mod upgrade;

pub use config::execute as config;
pub use get::execute as get;
pub use prefetch::execute as prefetch;
pub use reset::execute as reset;
pub use status::execute as status;
pub use upgrade::execute as upgrade;
