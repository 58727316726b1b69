pub mod aggregator;
pub mod autoplay;
pub mod bindings;
pub mod chat;
pub mod energy;
pub mod evaluator;
pub mod imagen;
pub mod resolver;
pub mod session;
pub mod templates;
pub mod tree;
pub mod walker;
