//! CLI module for mapstyle - command-line arguments.

pub mod args;

pub use args::Cli;
