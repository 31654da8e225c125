// Systems that advance a `World` by one fixed tick.

pub mod collision;
pub mod control;
pub mod generation;
pub mod gravity;
pub mod physics;
