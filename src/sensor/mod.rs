//! Temperature sensor abstraction used by the `/temp` resource.

use async_trait::async_trait;
use thiserror::Error;

pub use w1::W1Thermometer;

mod w1;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor not present: {0}")]
    NotPresent(String),

    #[error("sensor I/O failed")]
    Io(#[from] std::io::Error),

    #[error("malformed sensor reading: {0:?}")]
    Malformed(String),

    #[error("reading out of range: {0} centi-degrees")]
    OutOfRange(i32),

    #[error("sensor read failed: {0}")]
    Read(String),
}

/// A device that reports temperature in hundredths of a degree Celsius.
///
/// `init` is called before the first read and again after a failed read; `shutdown` when the
/// node stops.
#[async_trait]
pub trait TemperatureSensor: Send + Sync + 'static {
    async fn init(&mut self) -> Result<(), SensorError>;

    async fn read_centi_celsius(&mut self) -> Result<i16, SensorError>;

    async fn shutdown(&mut self) {}
}

#[async_trait]
impl<S: TemperatureSensor + ?Sized> TemperatureSensor for Box<S> {
    async fn init(&mut self) -> Result<(), SensorError> {
        (**self).init().await
    }

    async fn read_centi_celsius(&mut self) -> Result<i16, SensorError> {
        (**self).read_centi_celsius().await
    }

    async fn shutdown(&mut self) {
        (**self).shutdown().await
    }
}

/// Stand-in for nodes without a thermometer: every initialization fails, so `/temp` answers
/// 5.00.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unavailable;

#[async_trait]
impl TemperatureSensor for Unavailable {
    async fn init(&mut self) -> Result<(), SensorError> {
        Err(SensorError::NotPresent("no sensor configured".to_string()))
    }

    async fn read_centi_celsius(&mut self) -> Result<i16, SensorError> {
        Err(SensorError::NotPresent("no sensor configured".to_string()))
    }
}

/// Convert a reading in hundredths of a degree, rejecting values that do not fit the wire
/// representation.
pub(crate) fn centi_from_i32(value: i32) -> Result<i16, SensorError> {
    i16::try_from(value).map_err(|_| SensorError::OutOfRange(value))
}
