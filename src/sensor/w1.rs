use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;

use super::{centi_from_i32, SensorError, TemperatureSensor};

/// 1-Wire thermometer (DS18B20 and friends) exposed by the Linux `w1_therm` driver.
///
/// `dir` is the device directory, e.g. `/sys/bus/w1/devices/28-0316a2795dff`.  Its
/// `temperature` attribute holds the reading in millidegrees Celsius.
#[derive(Debug, Clone)]
pub struct W1Thermometer {
    dir: PathBuf,
}

impl W1Thermometer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn attribute(&self) -> PathBuf {
        self.dir.join("temperature")
    }
}

#[async_trait]
impl TemperatureSensor for W1Thermometer {
    async fn init(&mut self) -> Result<(), SensorError> {
        let attribute = self.attribute();
        match tokio::fs::metadata(&attribute).await {
            Ok(meta) if meta.is_file() => {
                debug!("Using 1-Wire thermometer at {}", self.dir.display());
                Ok(())
            }
            _ => Err(SensorError::NotPresent(attribute.display().to_string())),
        }
    }

    async fn read_centi_celsius(&mut self) -> Result<i16, SensorError> {
        let raw = tokio::fs::read_to_string(self.attribute()).await?;
        let trimmed = raw.trim();
        let milli: i32 = trimmed
            .parse()
            .map_err(|_| SensorError::Malformed(trimmed.to_string()))?;
        centi_from_i32(milli / 10)
    }
}
