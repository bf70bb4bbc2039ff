//! Motion control: the trapezoidal profile planner and the resumable
//! dispense controller that executes it in bounded slices.

pub mod motion;
pub mod profile;
