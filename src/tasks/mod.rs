pub mod artwork;
pub mod preview;
