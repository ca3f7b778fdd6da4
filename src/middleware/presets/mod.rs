//! Built-in middlewares named by §4.6: default-settings, simulate-streaming,
//! and a `tracing`-based logging wrapper.

mod default_settings;
mod simulate_streaming;
mod telemetry;

pub use default_settings::DefaultSettingsMiddleware;
pub use simulate_streaming::SimulateStreamingMiddleware;
pub use telemetry::TelemetryMiddleware;
