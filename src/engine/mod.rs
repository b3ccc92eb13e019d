// Engine core

pub mod animation;
pub mod collision;
pub mod config;
pub mod error;
pub mod events;
pub mod game;
pub mod providers;
pub mod scene;
pub mod scheduler;
