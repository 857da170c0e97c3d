//! Blocking client for the Syndic8 feed directory's XML-RPC interface.
//!
//! # Overview
//! `DirectoryClient` exposes each remote operation as a typed method. Calls
//! are encoded as XML-RPC, sent over a `Transport` (by default a long-lived
//! `ureq` agent) and decoded into `Value`s; service faults surface as
//! `ApiError::RemoteFault`, everything else that goes wrong as
//! `ApiError::Transport`.
//!
//! # Design
//! - Request building and response parsing are split from I/O
//!   (`build_call` / `parse_response` vs. `Transport::execute`), so the whole
//!   client can be driven by a scripted transport in tests.
//! - Feed records are untyped `BTreeMap<String, Value>`s; the service owns
//!   their schema.
//! - Passwords are hashed once on construction and only the digest is sent.
//!
//! ```no_run
//! use syndic8_core::DirectoryClient;
//!
//! let mut client = DirectoryClient::anonymous()?;
//! client.set_max_results(10);
//! for feed in client.search("cooking")? {
//!     println!("{:?}", feed.get("sitename"));
//! }
//! # Ok::<(), syndic8_core::ApiError>(())
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;
pub mod value;

pub use client::DirectoryClient;
pub use config::{ClientConfig, Endpoint};
pub use credentials::Credentials;
pub use error::ApiError;
pub use http::{HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{FeedRecord, NewUser, QueryOperator};
pub use value::Value;
