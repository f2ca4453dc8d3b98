//! Session state supplied by the identity subsystem.
//!
//! Sign-in itself happens elsewhere; this module only carries the stable
//! entity id and bearer token a sync manager is constructed from, and the
//! logged-in/out signal that gates construction.

pub mod session;

pub use session::{Session, SessionData};
