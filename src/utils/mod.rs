mod backoff;
mod error;
mod time;

pub use backoff::*;
pub use error::*;
pub use time::*;
