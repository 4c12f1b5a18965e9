//! BiDi wire-level types (spec.md §6): the command/event envelope shapes
//! and the payload structs the processors build to hand off to the event
//! manager and the router.

pub mod router;
pub mod types;
