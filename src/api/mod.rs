pub mod feed;
pub mod itunes;
pub mod normalize;
