//! Per-packet-type handlers.

mod control;
mod dispatch;
mod evict;
mod traffic;
