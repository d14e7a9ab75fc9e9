#![doc = include_str!("../README.md")]

mod error;
mod prefetch;
mod source;
mod task;

pub use crate::error::*;
pub use crate::prefetch::*;
pub use crate::source::*;
pub use crate::task::*;
pub use tokio_util::sync::CancellationToken;
