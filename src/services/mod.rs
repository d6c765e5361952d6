//! Entity services: `Push`, `Pull`, `Get`, `List`,
//! `ApplyMutation`, implemented once against a small per-family
//! dispatch rather than seven near-identical copies. Every method here
//! is stateless -- all state lives in storage, reached through
//! [`DbPool`].

mod mutation;
mod sync;

pub use mutation::{ApplyMutationOptions, MutationError};
pub use sync::EntityService;
