use crate::error::{ErrorKind, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use exn::ResultExt;
use trawl_source::Encoding;

/// Turn an entry's transferred content into text.
///
/// Base64 is decoded after stripping whitespace (the contents API wraps its
/// output). Returns `Ok(None)` for content that is empty or whitespace-only,
/// and an error for anything that is not UTF-8 text.
pub fn decode(content: &str, encoding: Encoding) -> Result<Option<String>> {
    let text = match encoding {
        Encoding::Plain => content.to_string(),
        Encoding::Base64 => {
            let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            let bytes = BASE64.decode(compact).or_raise(|| ErrorKind::InvalidBase64)?;
            String::from_utf8(bytes).or_raise(|| ErrorKind::InvalidUtf8)?
        },
    };
    // Valid UTF-8 can still be binary.
    if text.contains('\0') {
        exn::bail!(ErrorKind::Binary);
    }
    if text.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(text))
}
