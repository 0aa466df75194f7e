//! HTTP client for the upstream profile service.
//!
//! Wraps the four upstream hosts behind one [`MojangClient`]:
//!
//! - the auth server (`authenticate` / `validate` / `refresh`)
//! - the account API (security-question challenges)
//! - the services API (skin change, current profile)
//! - the session server (signed profile with texture descriptor)
//!
//! All base URLs are configurable so tests can point the client at a mock.

pub mod client;
pub mod profile;

pub use client::{MojangClient, MojangConfig, MojangError};
pub use profile::{decode_textures, DecodedTextures, ProfileProperty, SignedProfile};
