//! Request execution: building, sending, retrying and rendering.

pub mod executor;
pub mod request;
pub mod response;
pub mod transport;

pub use executor::execute;
pub use transport::{HttpTransport, Transport};
