//! # coach-store
//!
//! Persistence of user profiles and chat history.
//!
//! - [`ChatStore`] / [`ProfileStore`] - the traits the assistant talks to
//! - [`InMemoryStore`] - process-local backend
//! - [`SupabaseStore`] - Supabase (PostgREST) backend, `supabase` feature
//!
//! Profile fetches return a [`ProfileLookup`] so a missing row and an
//! unreachable backend can be told apart.

pub mod error;
pub mod inmemory;
pub mod store;
#[cfg(feature = "supabase")]
pub mod supabase;

pub use error::{Result, StoreError};
pub use inmemory::InMemoryStore;
pub use store::{ChatStore, ProfileLookup, ProfileStore};
#[cfg(feature = "supabase")]
pub use supabase::{ProfileRow, SupabaseStore};
