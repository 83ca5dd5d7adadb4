pub mod controller;
pub mod event;
pub mod intent;
pub mod reactor;
pub mod router;
pub mod scheduler;
pub mod segment;
pub mod state;
pub mod telemetry;
pub mod time;
