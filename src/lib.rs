//! Client for the "rastro" parcel tracking API.
//!
//! [`TrackingClient`] covers synchronous lookups, asynchronous batch
//! registration and receipt-based retrieval. [`batch`] reads and validates
//! files of tracking codes for registration.

pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod tracker;

pub use client::{ClientOptions, RequestOptions, TrackingClient, split_codes};
pub use error::{RastroError, Result};
pub use models::{AsyncRegistration, Facility, ResultFilter, TrackedObject, TrackingEvent, TrackingResult};
