pub mod html;
pub mod mock;
pub mod portal;
pub mod portal_http;
pub mod push;
