#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod app;
pub mod classifier;
pub mod config;
pub mod observability;
pub mod pipeline;
pub mod scheduler;
pub mod store;
pub mod util;
