//! Per-task-kind logic. Per the Design Notes in SPEC_FULL.md §9, each task
//! kind here is a tagged module discriminated by the reactor's select loop
//! rather than a dynamically-dispatched closure: `client` accepts new
//! connections (`accept_client`) and drives one connection's reader/writer
//! pair, `peer` decodes inbound datagrams, and `timer` fires and re-arms
//! periodic callbacks.

pub mod client;
pub mod peer;
pub mod timer;
