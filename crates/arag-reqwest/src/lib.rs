#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod client;
mod config;
mod error;
mod store;

pub use crate::client::{ReqwestAgentStore, TRACING_TARGET};
pub use crate::config::{DEFAULT_TIMEOUT, ReqwestConfig};
pub use crate::error::{Error, Result};
