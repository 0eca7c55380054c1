// stockfeed CLI library - pipeline orchestration and terminal rendering,
// shared by the binary and its tests

pub mod pipeline;
pub mod progress;
pub mod render;
