//! Status propagation engine
//!
//! Completion and reopen cascades across parent/child relations, plus the
//! per-task serialization of status operations.

mod cascade;
mod in_flight;

pub use cascade::{
    check_transition, offers_descendant_reopen, plan_status_change, ChangeReason, StatusChange,
    COMPLETION_GUARD_MESSAGE,
};
pub use in_flight::{InFlight, InFlightToken};
