//! Repository-level integration tests, run against a real Postgres via
//! `testcontainers` (see [`harness`]). All tests here require Docker
//! and are `#[ignore]`d; run with `cargo test -- --ignored`.

mod chat_messages;
pub mod harness;
mod owner_state;
