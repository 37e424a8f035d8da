pub mod encoding;
pub mod key;
pub mod placeholder;

pub use key::{mime_for_key, normalize, AssetKey, KeyError};
