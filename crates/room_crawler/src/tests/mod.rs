//! Cross-module tests against a copy of the Test level


mod room_flow;
mod scene_change_flow;
