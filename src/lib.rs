//! `reqkit` is an HTTP request execution engine for API SDKs with pluggable
//! low-level transports.
//!
//! One logical [`Request`] is turned into as many physical transmissions as
//! its configuration allows. Every unsuccessful outcome is offered, in
//! order, to an application [`UnsuccessfulResponseHandler`], a
//! [`BackOffPolicy`], and redirect handling; all retry triggers draw from a
//! single shared retry budget.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use reqkit::prelude::{ExponentialBackOffPolicy, RequestFactory, UreqTransport};
//! use url::Url;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let factory = RequestFactory::new(Arc::new(UreqTransport::new()));
//!
//!     let mut request = factory.get(Url::parse("https://api.example.com/v1/items")?);
//!     request
//!         .set_number_of_retries(3)
//!         .set_backoff_policy(ExponentialBackOffPolicy::standard());
//!
//!     let mut response = request.execute()?;
//!     println!("status={} body={}", response.status(), response.text()?);
//!     Ok(())
//! }
//! ```
//!
//! # Recommended Defaults
//!
//! - Give retryable traffic a backoff policy; without one a 5xx fails on the
//!   first attempt.
//! - Leave `follow_redirects` on unless the caller inspects 3xx itself.
//! - Keep transport-error retries off for non-idempotent requests.

mod backoff;
mod content;
mod error;
mod execute;
mod future;
mod handler;
mod redirect;
mod request;
mod response;
mod status;
pub mod testing;
mod transport;
mod ureq_transport;
mod util;

pub use crate::backoff::{BackOffPolicy, ExponentialBackOffPolicy};
pub use crate::content::{BytesContent, HttpContent};
pub use crate::error::{Error, ErrorCode};
pub use crate::future::{ResponseFuture, TaskRunner, ThreadTaskRunner};
pub use crate::handler::UnsuccessfulResponseHandler;
pub use crate::redirect::resolve_location;
pub use crate::request::{Request, RequestFactory};
pub use crate::response::Response;
pub use crate::status::{is_redirect_status, is_success_status};
pub use crate::transport::{RawResponse, StagedContent, Transport, TransportRequest};
pub use crate::ureq_transport::UreqTransport;
pub use crate::util::USER_AGENT_SUFFIX;

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use crate::{
        BackOffPolicy, BytesContent, Error, ErrorCode, ExponentialBackOffPolicy, HttpContent,
        RawResponse, Request, RequestFactory, Response, ResponseFuture, Result, TaskRunner,
        ThreadTaskRunner, Transport, TransportRequest, UnsuccessfulResponseHandler, UreqTransport,
    };
}
