pub mod clear;
pub mod completions;
pub mod config;
pub mod history;
pub mod run;
pub mod stats;
pub mod suggest;
