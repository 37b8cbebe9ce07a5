pub mod service;

pub use service::DeviceEnumeratorService;
