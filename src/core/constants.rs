/// Default per-stream ring buffer capacity (one day at one sample per second).
pub const DEFAULT_BUFFER_SIZE: usize = 86_400;
/// Default simulated feed rate in samples per minute.
pub const DEFAULT_SAMPLE_RATE: u32 = 60;
/// Highest feed rate in samples per minute, one tick per millisecond.
pub const MAX_SAMPLE_RATE: u32 = 60_000;
/// Default correlation window in minutes. Only reported, windowing is point based.
pub const DEFAULT_CORRELATION_MINUTES: u32 = 30;
/// Default number of trailing points fed into a correlation.
pub const DEFAULT_CORRELATION_POINTS: usize = 100;
/// Minimum samples each buffer needs before a correlation is computed.
pub const MIN_CORRELATION_SAMPLES: usize = 10;
/// Number of trailing samples the outlier filter looks at.
pub const DEFAULT_OUTLIER_WINDOW: usize = 10;
/// Standard deviation multiplier above which a sample is an outlier.
pub const DEFAULT_OUTLIER_Z_SCORE: f64 = 3.0;
/// Retained alerts per session.
pub const DEFAULT_ALERT_CAPACITY: usize = 100;
/// Upper bound for the stream directory round trip on connect.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
/// Flag attached to samples rejected by the outlier filter.
pub const OUTLIER_FLAG: &str = "outlier";
