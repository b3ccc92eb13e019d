// Shared primitives used by every engine subsystem

pub mod math;

pub use math::Rect;
