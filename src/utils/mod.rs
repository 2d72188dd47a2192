pub mod clock;
pub mod errors;
pub mod page;
pub mod ratelimit;

pub use clock::{Clock, SystemClock};
pub use errors::RouteError;
