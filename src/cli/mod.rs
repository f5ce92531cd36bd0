mod context;
pub mod utils;

pub use context::{CliContext, SetupArgs};
