//! Weighted Fair Queueing drain scheduler: moves full rings off each
//! thread's lanes and into its trace writer, fairly, without ever blocking a
//! producer.

mod config;
mod fairness;
mod scheduler;

pub use config::DrainConfig;
pub use fairness::jains_fairness_index;
pub use scheduler::{DrainScheduler, DrainStats};
