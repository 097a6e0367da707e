pub mod analyzer;
pub mod archive;
pub mod checker;
pub mod config;
pub mod error;
pub mod git;
pub mod github;
pub mod lockfile;
pub mod model;
pub mod output;
pub mod registry;
pub mod retry;
pub mod scanner;

pub use config::Config;
pub use error::{Result, ScanError};
pub use model::ScanResult;
pub use scanner::Scanner;
