mod tracker;

pub use tracker::MapTracker;
