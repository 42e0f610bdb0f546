//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (lifecycle, accept loop, hyper connection, middleware)
//!     → request.rs (read body, decode query, route path)
//!     → RequestHandler on a blocking worker
//!     → response.rs (write-once ResponseWriter)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{IncomingRequest, RequestError};
pub use response::{ContentType, OutgoingResponse, ResponseWriter};
pub use server::{HttpServer, RequestHandler, ServerError, ServerOptions};
