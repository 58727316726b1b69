//! Lex Speculum — judgment, faction and ending engine for a courtroom
//! narrative game.
//!
//! The player walks a branching judgment tree per case, buys faction
//! storylines whose requirements are checked against the path taken, and
//! the accumulated opinion and faction influence resolve into an ending
//! prompt for an image-generation service.

pub mod core;
pub mod schema;
