// Game layer: data-driven constructions on top of the engine core

pub mod room;

pub use room::RoomLoader;
