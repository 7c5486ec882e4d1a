//! The node's resource handlers.

pub use digest::{DigestHandler, DEFAULT_MAX_SESSIONS, EXCHANGE_LIFETIME};
pub use echo::echo;
pub use temperature::{format_temperature, SensorInit, TemperatureHandler};

pub mod digest;
pub mod echo;
pub mod temperature;
