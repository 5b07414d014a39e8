//! Device side of the tracker: the serial link (feature `hardware`), a
//! simulated camera and servo sink, and the built-in bright-spot detector.

pub mod detect;
pub mod error;
#[cfg(feature = "hardware")]
pub mod serial;
pub mod sim;

pub use detect::BrightSpotDetector;
#[cfg(feature = "hardware")]
pub use serial::SerialLink;
pub use sim::{RecordingSink, SimulatedCamera};
