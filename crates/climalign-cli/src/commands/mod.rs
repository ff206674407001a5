//! Thin dispatch layer: one module per subcommand area, each building the
//! inputs a lower crate needs and reporting the result. Mirrors
//! `gat_cli::commands`'s shape (a dispatcher per area, handlers that build a
//! config struct then call into the library crates).

pub mod completions;
pub mod crop;
pub mod pipeline;
pub mod project;
pub mod regions;
pub mod runs;
