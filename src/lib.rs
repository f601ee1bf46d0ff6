//! Access-control core for the munch campus dining app.
//!
//! SYSTEM CONTEXT
//! ==============
//! The edge gatekeeper decides per request whether a page may render, the
//! session store keeps the signed-in identity and its profile in sync with
//! the identity provider, and the layout guard mirrors the gatekeeper on the
//! client while the first auth-state notification is still pending. Both
//! gates share one route table in [`access::policy`].

pub mod access;
pub mod config;
pub mod identity;
pub mod marker;
pub mod profile;
pub mod routes;
pub mod session;
pub mod state;
pub mod store;
