pub mod http;
pub mod mock;

pub use http::{BackendConfig, HttpBackend};
pub use mock::{MockBackend, MockQuery, MockSubmit};
