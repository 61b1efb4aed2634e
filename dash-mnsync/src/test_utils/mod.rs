//! Scripted collaborators for tests of the sync.

mod listener;
mod peer;

pub use listener::RecordingListener;
pub use peer::{RecordedRequest, ScriptedAnswer, ScriptedPeer};
