pub mod errors;
pub mod ocpp_frame;
pub mod payload;
pub mod time;

pub use errors::*;
pub use ocpp_frame::*;
pub use payload::*;
pub use time::*;
