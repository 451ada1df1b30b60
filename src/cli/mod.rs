//! Command-line surface: clap argument structs for `draft`, `plan` and
//! `version`, plus the overlays they apply to config and prompt data.

pub mod args;
