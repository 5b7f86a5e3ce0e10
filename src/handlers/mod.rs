pub mod handoff;
pub mod health;
pub mod outcomes;
pub mod webhook;
