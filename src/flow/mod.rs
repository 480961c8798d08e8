pub mod lifecycle;
pub mod navigation;
