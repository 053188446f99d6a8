pub mod daemon;
pub mod prefs;
pub mod replay;
