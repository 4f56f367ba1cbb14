//! Gates consulted before anything reaches the delivery service.

pub mod milestone;
mod preferences;
mod quiet_hours;

pub use preferences::{PreferenceGate, Preferences};
pub use quiet_hours::{QuietHoursResolver, QuietWindow};
