//! Core orchestration for sheetbind.
//!
//! Wires the loader and binder into the `render` pipeline used by the CLI.

pub mod pipeline;
