pub mod executor;

pub use executor::SerialExecutor;
