mod controller;
mod session;
mod state;

pub use controller::*;
pub use session::*;
pub use state::*;
