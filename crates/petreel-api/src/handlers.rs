//! Request handlers.

pub mod health;
pub mod payments;
pub mod result;
pub mod status;
pub mod upload;

pub use health::*;
pub use payments::*;
pub use result::*;
pub use status::*;
pub use upload::*;
