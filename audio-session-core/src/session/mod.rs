pub mod controller;
pub mod poller;

pub use controller::SessionController;
pub use poller::PEAK_POLL_INTERVAL;
