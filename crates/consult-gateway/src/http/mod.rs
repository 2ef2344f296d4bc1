pub mod anketa;
pub mod dialogue;
pub mod documents;
pub mod error;
pub mod export;
pub mod middleware;
pub mod rooms;
pub mod session;
