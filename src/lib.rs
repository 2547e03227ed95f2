//! bucket-sync: keeps a knowledge-base dataset in step with a storage bucket.
//!
//! Each bucket change notification batch is reconciled against the dataset
//! named after the bucket: created objects are uploaded (or re-uploaded over
//! the existing document of the same name) and removed objects have their
//! document deleted.

pub mod cli;
pub mod config;
pub mod contract;
pub mod dataset;
pub mod download;
pub mod error;
pub mod event;
pub mod index;
pub mod key_codec;
pub mod load_config;
pub mod logging;
pub mod synchronise;
pub mod upload;

pub use cli::{run, Cli, Commands};
