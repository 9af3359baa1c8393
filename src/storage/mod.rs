//! Storage implementations for different backends

pub mod in_memory;
pub mod supabase;

pub use in_memory::{InMemoryDataService, InMemoryObjectStore};
pub use supabase::{PostgrestDataService, SupabaseAuthProvider, SupabaseClient, SupabaseObjectStore};
