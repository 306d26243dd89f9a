//! Live sensor readings via BLE notifications.
//!
//! A [`ReadingStream`] is the single owned handle for one notification
//! subscription. It decodes every payload the flowerpot pushes and yields
//! it as a [`SensorReading`]. Malformed payloads surface as
//! [`Error::InvalidPayload`] items instead of being replaced by defaults.
//!
//! The subscription is released when the stream is closed: [`ReadingStream::close`]
//! cancels the background task and waits for its teardown (the BLE unsubscribe)
//! to finish. Dropping the stream cancels it too, but without waiting.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use flowerpot_types::{SensorReading, SoilCalibration};

use crate::error::{Error, Result};

/// Options for reading streams.
///
/// ```
/// use flowerpot_core::StreamOptions;
///
/// let options = StreamOptions::builder()
///     .buffer_size(32)
///     .max_consecutive_failures(5)
///     .build();
/// assert!(options.include_errors);
/// ```
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Buffer size for the reading channel.
    /// Default: 16 readings.
    pub buffer_size: usize,
    /// Whether malformed payloads are delivered as `Err` items.
    ///
    /// When `true` (default), a payload that fails to decode is sent as
    /// `Err(Error::InvalidPayload(..))` and the stream continues. When `false`
    /// it is logged and skipped.
    pub include_errors: bool,
    /// Close the stream after this many malformed payloads in a row.
    ///
    /// `None` (default) keeps the stream open regardless.
    pub max_consecutive_failures: Option<u32>,
    /// Soil calibration used to derive fertility.
    pub calibration: SoilCalibration,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            buffer_size: 16,
            include_errors: true,
            max_consecutive_failures: None,
            calibration: SoilCalibration::default(),
        }
    }
}

impl StreamOptions {
    /// Create a new builder for StreamOptions.
    pub fn builder() -> StreamOptionsBuilder {
        StreamOptionsBuilder::default()
    }

    /// Validate the options and return an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(Error::invalid_config("buffer_size must be > 0"));
        }
        if self.max_consecutive_failures == Some(0) {
            return Err(Error::invalid_config("max_consecutive_failures must be > 0"));
        }
        self.calibration
            .validate()
            .map_err(|e| Error::invalid_config(e.to_string()))
    }
}

/// Builder for StreamOptions.
#[derive(Debug, Clone, Default)]
pub struct StreamOptionsBuilder {
    options: StreamOptions,
}

impl StreamOptionsBuilder {
    /// Set the buffer size.
    #[must_use]
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.options.buffer_size = size;
        self
    }

    /// Set whether to include decode errors in the stream.
    #[must_use]
    pub fn include_errors(mut self, include: bool) -> Self {
        self.options.include_errors = include;
        self
    }

    /// Set the maximum consecutive failures before auto-closing.
    #[must_use]
    pub fn max_consecutive_failures(mut self, max: u32) -> Self {
        self.options.max_consecutive_failures = Some(max);
        self
    }

    /// Set the soil calibration.
    #[must_use]
    pub fn calibration(mut self, calibration: SoilCalibration) -> Self {
        self.options.calibration = calibration;
        self
    }

    /// Build the StreamOptions.
    #[must_use]
    pub fn build(self) -> StreamOptions {
        self.options
    }
}

/// Result type for stream items.
pub type ReadingResult = std::result::Result<SensorReading, Error>;

/// A stream of decoded readings from one notification subscription.
pub struct ReadingStream {
    receiver: mpsc::Receiver<ReadingResult>,
    handle: Option<tokio::task::JoinHandle<()>>,
    cancel_token: CancellationToken,
}

impl std::fmt::Debug for ReadingStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadingStream")
            .field("cancelled", &self.cancel_token.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl ReadingStream {
    /// Decode raw notification payloads from `source`.
    ///
    /// Must be called within a Tokio runtime.
    pub fn from_source<S>(source: S, options: StreamOptions) -> Self
    where
        S: Stream<Item = Vec<u8>> + Send + 'static,
    {
        Self::with_teardown(source, options, async {})
    }

    /// Like [`ReadingStream::from_source`], running `teardown` once the
    /// background task stops for any reason.
    pub fn with_teardown<S, F>(source: S, options: StreamOptions, teardown: F) -> Self
    where
        S: Stream<Item = Vec<u8>> + Send + 'static,
        F: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(options.buffer_size.max(1));
        let cancel_token = CancellationToken::new();
        let task_token = cancel_token.clone();

        let handle = tokio::spawn(async move {
            let mut source = Box::pin(source);
            let max_failures = options.max_consecutive_failures;
            let mut consecutive_failures: u32 = 0;

            loop {
                let payload = tokio::select! {
                    _ = task_token.cancelled() => {
                        debug!("Reading stream cancelled");
                        break;
                    }
                    payload = source.next() => payload,
                };

                let Some(payload) = payload else {
                    debug!("Notification source ended");
                    break;
                };

                match SensorReading::from_bytes_with_calibration(&payload, &options.calibration)
                {
                    Ok(reading) => {
                        consecutive_failures = 0;
                        let reading = reading.with_captured_at(time::OffsetDateTime::now_utc());
                        if tx.send(Ok(reading)).await.is_err() {
                            debug!("Stream receiver dropped, stopping");
                            break;
                        }
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        warn!(
                            "Malformed notification ({} bytes, failure {}/{}): {}",
                            payload.len(),
                            consecutive_failures,
                            max_failures.map_or("∞".to_string(), |n| n.to_string()),
                            e
                        );

                        let exhausted = max_failures.is_some_and(|max| consecutive_failures >= max);
                        if options.include_errors && tx.send(Err(e.into())).await.is_err() {
                            debug!("Stream receiver dropped, stopping");
                            break;
                        }
                        if exhausted {
                            warn!("Max consecutive failures reached, closing stream");
                            break;
                        }
                    }
                }
            }

            drop(source);
            teardown.await;
            debug!("Reading stream torn down");
        });

        Self {
            receiver: rx,
            handle: Some(handle),
            cancel_token,
        }
    }

    /// Stop the stream and wait until the subscription has been released.
    pub async fn close(mut self) {
        self.cancel_token.cancel();
        // Unblocks a task waiting on a full channel
        self.receiver.close();
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.await
        {
            warn!("Reading stream task failed during close: {}", e);
        }
    }

    /// Get a cancellation token that can be used to cancel the stream externally.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Check if the background task is still running.
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Check if the stream has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Returns `true` if the task stopped without being cancelled, e.g. because
    /// the device went away or `max_consecutive_failures` was reached.
    pub fn has_unexpectedly_stopped(&self) -> bool {
        !self.is_active() && !self.cancel_token.is_cancelled()
    }
}

impl Drop for ReadingStream {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

impl Stream for ReadingStream {
    type Item = ReadingResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use flowerpot_types::{ParseError, RawPayload};
    use futures::channel::mpsc as fmpsc;

    use super::*;

    fn payload(temperature: f32, soil_raw: i16) -> Vec<u8> {
        RawPayload {
            temperature,
            humidity: 60.0,
            luminosity: 150,
            soil_raw,
        }
        .to_bytes()
        .to_vec()
    }

    #[test]
    fn test_stream_options_default() {
        let opts = StreamOptions::default();
        assert_eq!(opts.buffer_size, 16);
        assert!(opts.include_errors);
        assert_eq!(opts.max_consecutive_failures, None);
        assert_eq!(opts.calibration, SoilCalibration::default());
    }

    #[test]
    fn test_stream_options_builder() {
        let cal = SoilCalibration::new(3000, 1000).unwrap();
        let opts = StreamOptions::builder()
            .buffer_size(32)
            .include_errors(false)
            .max_consecutive_failures(3)
            .calibration(cal)
            .build();

        assert_eq!(opts.buffer_size, 32);
        assert!(!opts.include_errors);
        assert_eq!(opts.max_consecutive_failures, Some(3));
        assert_eq!(opts.calibration, cal);
    }

    #[test]
    fn test_stream_options_validate() {
        assert!(StreamOptions::default().validate().is_ok());
        assert!(StreamOptions::builder().buffer_size(0).build().validate().is_err());
        assert!(
            StreamOptions::builder()
                .max_consecutive_failures(0)
                .build()
                .validate()
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_stream_decodes_notifications() {
        let source = futures::stream::iter(vec![payload(22.0, 2000), payload(25.4, 3400)]);
        let mut stream = ReadingStream::from_source(source, StreamOptions::default());

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.temperature, 22);
        assert_eq!(first.fertility, 68);
        assert!(first.captured_at.is_some());

        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.temperature, 25);
        assert_eq!(second.fertility, 0);

        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_stream_yields_error_for_short_payload_and_continues() {
        let source = futures::stream::iter(vec![vec![0x01, 0x02], payload(22.0, 2000)]);
        let mut stream = ReadingStream::from_source(source, StreamOptions::default());

        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidPayload(ParseError::InvalidPayload {
                expected: 12,
                actual: 2
            })
        ));

        let reading = stream.next().await.unwrap().unwrap();
        assert_eq!(reading.temperature, 22);
    }

    #[tokio::test]
    async fn test_stream_skips_errors_when_excluded() {
        let source = futures::stream::iter(vec![vec![0u8; 3], payload(22.0, 2000)]);
        let options = StreamOptions::builder().include_errors(false).build();
        let mut stream = ReadingStream::from_source(source, options);

        let reading = stream.next().await.unwrap().unwrap();
        assert_eq!(reading.temperature, 22);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_stream_closes_after_max_failures() {
        let source = futures::stream::iter(vec![
            vec![0u8; 1],
            vec![0u8; 2],
            payload(22.0, 2000),
        ]);
        let options = StreamOptions::builder().max_consecutive_failures(2).build();
        let mut stream = ReadingStream::from_source(source, options);

        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
        assert!(!stream.is_cancelled());
    }

    #[tokio::test]
    async fn test_close_runs_teardown() {
        let (_tx, rx) = fmpsc::unbounded::<Vec<u8>>();
        let released = Arc::new(AtomicBool::new(false));
        let flag = released.clone();

        let stream = ReadingStream::with_teardown(rx, StreamOptions::default(), async move {
            flag.store(true, Ordering::SeqCst);
        });
        assert!(stream.is_active());

        stream.close().await;
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_drop_cancels_stream() {
        let (_tx, rx) = fmpsc::unbounded::<Vec<u8>>();
        let stream = ReadingStream::from_source(rx, StreamOptions::default());
        let token = stream.cancellation_token();

        drop(stream);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_external_cancellation() {
        let (_tx, rx) = fmpsc::unbounded::<Vec<u8>>();
        let mut stream = ReadingStream::from_source(rx, StreamOptions::default());

        stream.cancellation_token().cancel();
        assert!(stream.next().await.is_none());
        assert!(stream.is_cancelled());
        assert!(!stream.has_unexpectedly_stopped());
    }
}
