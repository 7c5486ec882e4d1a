//! `GET /temp`: the current temperature as `Temp: <C>.<cc> C`.

use std::sync::Arc;

use async_trait::async_trait;
use coap_lite::{ContentFormat, ResponseType};
use log::{debug, warn};
use tokio::sync::Mutex;

use crate::app::{CoapError, HandlerResult, Request, RequestHandler};
use crate::sensor::{SensorError, TemperatureSensor};

/// When the sensor is (re)initialized.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SensorInit {
    /// Initialize before every read.
    EveryRequest,

    /// Initialize on first use and keep the sensor ready; a failed read forces a fresh
    /// initialization on the next request.
    #[default]
    Once,
}

struct SensorSession<S> {
    sensor: S,
    ready: bool,
}

/// Reads the sensor on each request.  Reads are serialized, so concurrent requests never reach
/// the device at the same time.
pub struct TemperatureHandler<S> {
    session: Arc<Mutex<SensorSession<S>>>,
    init_policy: SensorInit,
}

impl<S> Clone for TemperatureHandler<S> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            init_policy: self.init_policy,
        }
    }
}

impl<S: TemperatureSensor> TemperatureHandler<S> {
    pub fn new(sensor: S) -> Self {
        Self {
            session: Arc::new(Mutex::new(SensorSession {
                sensor,
                ready: false,
            })),
            init_policy: SensorInit::default(),
        }
    }

    pub fn init_policy(mut self, policy: SensorInit) -> Self {
        self.init_policy = policy;
        self
    }

    /// Take one reading in hundredths of a degree Celsius, initializing the sensor first when
    /// the policy asks for it.
    pub async fn read(&self) -> Result<i16, SensorError> {
        let mut session = self.session.lock().await;
        if !session.ready || self.init_policy == SensorInit::EveryRequest {
            session.sensor.init().await?;
            session.ready = true;
        }
        let reading = session.sensor.read_centi_celsius().await;
        if reading.is_err() {
            session.ready = false;
        }
        reading
    }

    /// Release the sensor.  The next read initializes it again.
    pub async fn shutdown(&self) {
        let mut session = self.session.lock().await;
        if session.ready {
            debug!("Shutting down temperature sensor");
            session.sensor.shutdown().await;
            session.ready = false;
        }
    }
}

#[async_trait]
impl<Endpoint, S> RequestHandler<Endpoint> for TemperatureHandler<S>
where
    Endpoint: Send + Sync + 'static,
    S: TemperatureSensor,
{
    async fn handle(&self, request: Request<Endpoint>) -> HandlerResult {
        let centi = self.read().await.map_err(|e| {
            warn!("Temperature read failed: {e}");
            CoapError::status(ResponseType::InternalServerError)
        })?;

        let mut response = request.new_response();
        response.set_status(ResponseType::Content);
        response.message.set_content_format(ContentFormat::TextPlain);
        response.message.payload = format_temperature(centi).into_bytes();
        Ok(response)
    }
}

/// Render hundredths of a degree as `Temp: 23.50 C`.  The sign is printed once, so values
/// between -1 and 0 degrees keep it.
pub fn format_temperature(centi: i16) -> String {
    let sign = if centi < 0 { "-" } else { "" };
    let magnitude = i32::from(centi).unsigned_abs();
    format!("Temp: {sign}{}.{:02} C", magnitude / 100, magnitude % 100)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use coap_lite::{RequestType, ResponseType};

    use crate::app::test_util::{new_request, TestEndpoint};
    use crate::app::RequestHandler;
    use crate::sensor::{SensorError, TemperatureSensor};

    use super::*;

    #[derive(Default, Clone)]
    struct Counters {
        inits: Arc<AtomicUsize>,
        reads: Arc<AtomicUsize>,
        shutdowns: Arc<AtomicUsize>,
    }

    struct FakeSensor {
        counters: Counters,
        init_ok: bool,
        readings: Vec<Result<i16, ()>>,
    }

    impl FakeSensor {
        fn new(readings: Vec<Result<i16, ()>>) -> (Self, Counters) {
            let counters = Counters::default();
            let sensor = Self {
                counters: counters.clone(),
                init_ok: true,
                readings,
            };
            (sensor, counters)
        }
    }

    #[async_trait]
    impl TemperatureSensor for FakeSensor {
        async fn init(&mut self) -> Result<(), SensorError> {
            self.counters.inits.fetch_add(1, Ordering::SeqCst);
            if self.init_ok {
                Ok(())
            } else {
                Err(SensorError::NotPresent("fake".to_string()))
            }
        }

        async fn read_centi_celsius(&mut self) -> Result<i16, SensorError> {
            self.counters.reads.fetch_add(1, Ordering::SeqCst);
            match self.readings.remove(0) {
                Ok(value) => Ok(value),
                Err(()) => Err(SensorError::Read("fake".to_string())),
            }
        }

        async fn shutdown(&mut self) {
            self.counters.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn get(handler: &TemperatureHandler<FakeSensor>) -> HandlerResult {
        let request = new_request(RequestType::Get, "/temp", "/temp", TestEndpoint(1));
        handler.handle(request).await
    }

    fn assert_internal_error(result: HandlerResult) {
        let err = result.unwrap_err();
        assert_eq!(err.code, Some(ResponseType::InternalServerError));
        assert!(err.message.is_empty());
    }

    #[test]
    fn test_format() {
        assert_eq!(format_temperature(2350), "Temp: 23.50 C");
        assert_eq!(format_temperature(2305), "Temp: 23.05 C");
        assert_eq!(format_temperature(0), "Temp: 0.00 C");
        assert_eq!(format_temperature(-150), "Temp: -1.50 C");
        assert_eq!(format_temperature(-5), "Temp: -0.05 C");
        assert_eq!(format_temperature(i16::MIN), "Temp: -327.68 C");
        assert_eq!(format_temperature(i16::MAX), "Temp: 327.67 C");
    }

    #[tokio::test]
    async fn test_reply() {
        let (sensor, _) = FakeSensor::new(vec![Ok(2350)]);
        let handler = TemperatureHandler::new(sensor);

        let response = get(&handler).await.unwrap();
        assert_eq!(*response.get_status(), ResponseType::Content);
        assert_eq!(
            response.message.get_content_format(),
            Some(ContentFormat::TextPlain)
        );
        assert_eq!(response.message.payload, b"Temp: 23.50 C");
    }

    #[tokio::test]
    async fn test_init_failure() {
        let (mut sensor, counters) = FakeSensor::new(vec![Ok(2350)]);
        sensor.init_ok = false;
        let handler = TemperatureHandler::new(sensor);

        assert_internal_error(get(&handler).await);
        assert_eq!(counters.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_read_failure_reinitializes() {
        let (sensor, counters) = FakeSensor::new(vec![Err(()), Ok(-5)]);
        let handler = TemperatureHandler::new(sensor);

        assert_internal_error(get(&handler).await);

        let recovered = get(&handler).await.unwrap();
        assert_eq!(recovered.message.payload, b"Temp: -0.05 C");
        assert_eq!(counters.inits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_init_once() {
        let (sensor, counters) = FakeSensor::new(vec![Ok(1), Ok(2), Ok(3)]);
        let handler = TemperatureHandler::new(sensor);

        for _ in 0..3 {
            get(&handler).await.unwrap();
        }
        assert_eq!(counters.inits.load(Ordering::SeqCst), 1);
        assert_eq!(counters.reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_init_every_request() {
        let (sensor, counters) = FakeSensor::new(vec![Ok(1), Ok(2), Ok(3)]);
        let handler = TemperatureHandler::new(sensor).init_policy(SensorInit::EveryRequest);

        for _ in 0..3 {
            get(&handler).await.unwrap();
        }
        assert_eq!(counters.inits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_shutdown() {
        let (sensor, counters) = FakeSensor::new(vec![Ok(1), Ok(2)]);
        let handler = TemperatureHandler::new(sensor);

        handler.shutdown().await;
        assert_eq!(counters.shutdowns.load(Ordering::SeqCst), 0);

        get(&handler).await.unwrap();
        handler.shutdown().await;
        assert_eq!(counters.shutdowns.load(Ordering::SeqCst), 1);

        get(&handler).await.unwrap();
        assert_eq!(counters.inits.load(Ordering::SeqCst), 2);
    }
}
