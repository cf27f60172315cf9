pub mod clock;
pub mod config_manager;
pub mod error;
pub mod feature;
pub mod findings;
pub mod hashing;
pub mod report;
pub mod traits;
pub mod types;
pub mod usage;

pub use clock::*;
pub use config_manager::*;
pub use error::*;
pub use feature::*;
pub use findings::*;
pub use hashing::*;
pub use report::*;
pub use traits::*;
pub use types::*;
pub use usage::*;

pub use tokio_util::sync::CancellationToken;
