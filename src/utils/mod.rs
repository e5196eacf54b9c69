// src/utils/mod.rs

pub mod comment_tree;
pub mod origin;
pub mod throttle;
