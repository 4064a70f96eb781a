mod extract_impl;
pub mod extractor_thread;
pub mod handler;
pub mod output;
pub mod progress;

pub use extract_impl::cmd_extract;
