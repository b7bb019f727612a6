//! Admin credential handling.
//!
//! Catalog reads are anonymous; image uploads need an admin bearer token,
//! which `CredentialStore` keeps in the OS keychain via keyring.

pub mod credentials;

pub use credentials::CredentialStore;
