pub mod device;
pub mod error;
pub mod events;
pub mod session;
