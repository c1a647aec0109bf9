//! Command implementations.

mod info;
mod run;
mod sweep;
mod validate;

pub use info::run_info;
pub use run::run_scheduler;
pub use sweep::{run_retry_sweep, run_ship_sweep};
pub use validate::run_validate;
