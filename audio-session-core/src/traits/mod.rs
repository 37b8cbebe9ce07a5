pub mod endpoint_backend;
pub mod process_metadata;
pub mod session_handle;
