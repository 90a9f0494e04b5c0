pub mod charts;
pub mod dashboard;
pub mod map;
pub mod panels;
pub mod tables;
