pub mod condition;
pub mod config;
pub mod context;
pub mod factory;
pub mod fragment;
pub mod pipeline;
pub mod repository;
pub mod scene;
pub mod text;
