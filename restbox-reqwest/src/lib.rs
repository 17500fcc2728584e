//! # restbox-reqwest
//!
//! Production [`Transport`](restbox_core::Transport) for
//! [restbox](https://docs.rs/restbox), built on
//! [reqwest](https://docs.rs/reqwest).
#![cfg_attr(docsrs, feature(doc_cfg))]

mod transport;

pub use transport::ReqwestTransport;

/// Re-export of the reqwest client type for convenience in type annotations.
pub use reqwest::Client as ReqwestClient;
