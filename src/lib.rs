//! Single-user bearer token session management
//!
//! This crate implements the token acquisition and session state machine for
//! a local application that authenticates one user against an OAuth2/OIDC
//! identity provider and calls one protected HTTP resource with the resulting
//! bearer token.
//!
//! The provider SDK itself (token endpoint calls, PKCE, cache encryption) is
//! a black box behind the [`IdentityBroker`][provider::IdentityBroker] trait;
//! what lives here is the decision logic: on every trigger — startup, manual
//! refresh, explicit sign-in or sign-out — whether a cached token can be
//! reused silently, whether the interactive flow must run, and how the
//! outcome propagates to the protected resource call.
//!
//! # Flow
//!
//! A [`SessionController`][session::SessionController] owns the single
//! [`SessionState`][session::SessionState] and drives a
//! [`TokenBroker`][acquire::TokenBroker], which in turn consults the
//! [`AccountCache`][account::AccountCache] and the identity broker. Failures
//! are values, not surprises: the [`AcquireError`][acquire::AcquireError]
//! taxonomy distinguishes the expected, silent states (no account, needs
//! interaction at startup, user cancellation) from unexpected provider
//! failures that must be shown to the user exactly once and never retried.
//!
//! Each trigger reports a [`SessionUpdate`][session::SessionUpdate] carrying
//! what a UI boundary renders: the display name (or a signed-out marker),
//! the bearer token text when the resource call succeeded, and at most one
//! user-visible message.

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

pub mod account;
pub mod acquire;
mod braids;
pub mod config;
pub mod provider;
pub mod resource;
pub mod session;
mod token;

pub use braids::*;
pub use token::TokenResult;
