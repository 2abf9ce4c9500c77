pub mod appointment;
pub mod conversation;
pub mod intent;
pub mod platform;
pub mod quota;
pub mod relay;
pub mod remote;
pub mod speech_input;
pub mod theme;
pub mod voice;
