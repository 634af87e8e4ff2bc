pub mod condition;
pub mod conversation;
pub mod graph;
pub mod ids;
pub mod record;
pub mod response;
pub mod script;
pub mod speaker;
