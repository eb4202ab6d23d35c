//! Slot computation and host selection engine.
//!
//! Turns recurring availability windows, one-off blocks, existing
//! bookings, and external calendar busy time into bookable slots, and
//! picks which host serves a booking for multi-host event types.

pub mod cache;
pub mod context;
pub mod db;
pub mod interval;
pub mod selector;
pub mod slots;

pub use cache::AvailableDaysCache;
pub use context::{EventType, EventTypeContext, SchedulingMode, fetch_event_type_context};
pub use interval::{Interval, floor_to_second};
pub use selector::select_host_for_slot;
pub use slots::{Slot, compute_slots_for_date};
