mod fps;
mod model;
mod store;

pub use fps::FpsMeter;
pub use model::{LiveFrame, TelemetrySnapshot};
pub use store::TelemetryStore;
