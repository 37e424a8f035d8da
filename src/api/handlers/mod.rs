mod assets;
mod health;
mod upload;

pub use assets::{serve_asset, serve_empty_key};
pub use health::health;
pub use upload::upload_asset;
