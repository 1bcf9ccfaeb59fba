pub mod api_response;
pub mod async_handler;
pub mod hash;
pub mod jwt;
pub mod media;
