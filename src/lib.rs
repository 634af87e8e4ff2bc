//! Dialogue Compiler: branching conversation scripts to engine records.
//!
//! Takes the topic graph an author wrote (topics, player prompts, spoken
//! lines, links, scenes) and emits the relational records a game engine
//! loads: dialogue topics with chained response sets, speaker conditions,
//! script fragment stubs, branches, and sequenced scenes. Records already
//! present with the same content are reused instead of duplicated.

pub mod core;
pub mod schema;
