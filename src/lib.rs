//! tpod - object detector training
//!
//! Registry of trainable detector types, a shared cache of pretrained
//! checkpoints, pipeline config materialization, and a launcher that starts
//! the external trainer as a background process.

pub mod audit;
pub mod cache;
pub mod cli;
pub mod config;
pub mod detector;
pub mod error;
pub mod launcher;
pub mod pbtxt;
pub mod provider;
pub mod ui;

pub use error::{TpodError, TpodResult};
