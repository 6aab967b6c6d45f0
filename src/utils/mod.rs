pub mod hash;
pub mod import;
pub mod jwt;
pub mod redirect;
