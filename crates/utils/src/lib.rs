pub mod jwt;
pub mod logging;
pub mod redirect;
pub mod response;
