//! Route gating shared by the server edge and the client layout.
//!
//! ARCHITECTURE
//! ============
//! `policy` owns the only copy of the route tables. `gatekeeper` applies it
//! to incoming HTTP requests using cookie presence alone; `guard` applies it
//! to session-store snapshots once the identity provider has resolved. Any
//! drift between the two would produce redirect loops, so neither keeps its
//! own list.

pub mod gatekeeper;
pub mod guard;
pub mod policy;
