pub mod builder;
pub mod cli;
pub mod config;
pub mod decode;
pub mod dhash;
pub mod error;
pub mod index;
pub mod scene;
pub mod search;
pub mod story;
pub mod utils;
pub mod video;

pub use config::Opts;
pub use error::{Error, Result};
pub use index::{FrameIndex, FrameRecord};
