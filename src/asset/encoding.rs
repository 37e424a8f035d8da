//! Data-URL encoding shared by the text-based tiers (mapping file, blob store).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Encode bytes as `data:<mime>;base64,<payload>`.
pub fn encode_data_url(mime_type: &str, data: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(data))
}

/// Decode a data URL (or a bare base64 payload) back into bytes.
///
/// Returns the embedded MIME type when one is present. `None` means the
/// payload could not be decoded.
pub fn decode_data_url(value: &str) -> Option<(Option<String>, Vec<u8>)> {
    let (mime_type, payload) = match value.strip_prefix("data:") {
        Some(rest) => {
            let (meta, payload) = rest.split_once(',')?;
            let mime = meta.strip_suffix(";base64")?;
            let mime = (!mime.is_empty()).then(|| mime.to_string());
            (mime, payload)
        }
        None => (None, value),
    };

    let bytes = STANDARD.decode(payload.trim()).ok()?;
    Some((mime_type, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_has_mime_prefix() {
        let url = encode_data_url("image/png", b"\x89PNG");
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_decode_data_url() {
        let url = encode_data_url("image/gif", b"GIF89a");
        let (mime, bytes) = decode_data_url(&url).unwrap();
        assert_eq!(mime.as_deref(), Some("image/gif"));
        assert_eq!(bytes, b"GIF89a");
    }

    #[test]
    fn test_decode_bare_base64() {
        let (mime, bytes) = decode_data_url("aGVsbG8=").unwrap();
        assert_eq!(mime, None);
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_data_url("data:image/png;base64,@@@").is_none());
        assert!(decode_data_url("data:image/png,plain").is_none());
        assert!(decode_data_url("data:no-comma").is_none());
    }
}
