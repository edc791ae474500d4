pub mod decision;
pub mod runner;
pub mod splitter;

pub use decision::{decide, Action};
pub use runner::{RunReport, Runner};
