//! wallsync - mirror Immich albums into a bounded wallpaper directory.
//!
//! The [`mirror::Mirror`] loop lists remote assets through an
//! [`mirror::AssetSource`], downloads what is missing into a single
//! directory, and evicts the oldest files once size or count caps are hit.

pub mod cli;
pub mod config;
pub mod immich;
pub mod imaging;
pub mod mirror;
pub mod storage;
pub mod utils;
