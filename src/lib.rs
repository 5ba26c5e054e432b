#![forbid(unsafe_code)]

pub mod assemble;
pub mod cli;
pub mod config;
pub mod error;
pub mod formats;
pub mod links;
pub mod logging;
pub mod package;
pub mod paths;
pub mod render;
pub mod sanitize;
pub mod state;
pub mod structure;
pub mod xhtml;
