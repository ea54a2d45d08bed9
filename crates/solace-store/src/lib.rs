pub mod error;
pub mod exchanges;

pub use error::StoreError;
pub use exchanges::ExchangeStore;
