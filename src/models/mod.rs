pub mod contact;
pub mod courier;
pub mod offer;
