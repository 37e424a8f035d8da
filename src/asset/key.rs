use std::fmt;

use thiserror::Error;

/// Image extensions that terminate a key. Anything appended after one of
/// these is treated as garbage and dropped.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "webp"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("Malformed asset key: {0:?}")]
    Malformed(String),
}

/// Sanitized lookup key shared by every storage tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetKey(String);

impl AssetKey {
    /// Normalize `raw` into a key. Fails only when nothing usable is left.
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        let normalized = normalize(raw);
        if normalized.is_empty() {
            return Err(KeyError::Malformed(raw.to_string()));
        }
        Ok(Self(normalized))
    }

    /// Wrap a string that is already in normalized form.
    pub(crate) fn from_normalized(key: String) -> Self {
        debug_assert!(!key.is_empty() && normalize(&key) == key);
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased extension, if the key ends in a recognized image extension.
    pub fn image_extension(&self) -> Option<&str> {
        let (_, ext) = self.0.rsplit_once('.')?;
        IMAGE_EXTENSIONS.contains(&ext).then_some(ext)
    }

    /// MIME type derived from the extension.
    pub fn mime_type(&self) -> String {
        mime_for_key(&self.0)
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AssetKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonicalize a requested or generated asset key.
///
/// Keeps only `[A-Za-z0-9._-]`, strips leading dots, then cuts everything
/// after the leftmost recognized image extension and lowercases that
/// extension. The result may be empty; it never contains a path separator.
pub fn normalize(raw: &str) -> String {
    let filtered: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let trimmed = filtered.trim_start_matches('.');

    match find_image_extension(trimmed) {
        Some((dot, ext)) => format!("{}.{}", &trimmed[..dot], ext),
        None => trimmed.to_string(),
    }
}

/// Position of the leftmost `.ext` match and the matched extension.
fn find_image_extension(s: &str) -> Option<(usize, &'static str)> {
    let lower = s.to_ascii_lowercase();
    lower
        .match_indices('.')
        .find_map(|(dot, _)| {
            let rest = &lower[dot + 1..];
            IMAGE_EXTENSIONS
                .iter()
                .find(|ext| rest.starts_with(*ext))
                .map(|ext| (dot, *ext))
        })
}

/// Resolve a MIME type from a key's extension, defaulting to octet-stream.
pub fn mime_for_key(key: &str) -> String {
    mime_guess::from_path(key)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
