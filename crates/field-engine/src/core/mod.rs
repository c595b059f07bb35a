pub mod events;
pub mod planner;
pub mod quality;
pub mod rng;
pub mod time;
pub mod viewport;
