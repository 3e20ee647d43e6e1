//! Weekly Steam activity dashboard.
//! Every run compares the current cumulative playtime of recently played games against the
//! latest stored snapshot, which gives a per-game "played this week" figure even though Steam
//! itself only reports a rolling two week window.
//!

pub mod cli;
pub mod delta;
pub mod steam;
pub mod storage;
pub mod utils;
