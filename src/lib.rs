pub mod allowlist;
pub mod cdp;
pub mod cli;
pub mod error;
pub mod http;
pub mod logging;
pub mod pipe;
pub mod session;
pub mod supervisor;
