pub mod credentials;
pub mod permissions;
