pub mod engine;
pub mod evidence;
pub mod resolver;
pub mod sequencer;
pub mod session;
pub mod submission;
