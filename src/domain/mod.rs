// Domain layer - Value types shared by every other layer
pub mod dashboard;
pub mod identity;
pub mod incubation;
pub mod table;
pub mod user;
pub mod wire;
