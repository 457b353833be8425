//! Selection Strategy Module
//!
//! - Parallel: one document per rayon task, for batches of documents

#[cfg(feature = "parallel")]
pub mod parallel;

#[cfg(feature = "parallel")]
pub use parallel::{select_parallel, select_xpath_parallel};
