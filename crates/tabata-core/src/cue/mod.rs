//! Cue scheduling and delivery tracking.
//!
//! A cue is a notable point on the workout's wall-clock timeline: a warning
//! ahead of a phase switch, the announcement closing out a set, or the
//! final completion notice. [`schedule`] turns a workout definition plus a
//! time reference into the full ordered list of remaining cues;
//! [`CueDeliveryTracker`] keeps re-generated schedules from delivering the
//! same logical cue twice.

mod delivery;
mod scheduler;

pub use delivery::CueDeliveryTracker;
pub use scheduler::{schedule, CueDescriptor, CueKind};
