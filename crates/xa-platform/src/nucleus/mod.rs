//! Nucleus (platform front-end) integration
//!
//! Caller identity, proxied listings, and the platform version.

pub mod client;
pub mod version;

pub use client::{
    CallerPrincipal, ListingUpstream, NucleusClient, PrincipalOracle, UpstreamListing,
};
pub use version::PlatformVersion;
