pub mod entities;
pub mod ranking;
pub mod repositories;
pub mod value_objects;
