pub mod alias;
pub mod location;
pub mod manager;
pub mod resolver;
pub mod settings;
pub mod storage;
