pub mod discovery;
pub mod feed;
pub mod settings;
pub mod shutdown;
pub mod ticker;
