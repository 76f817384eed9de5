/// MIME type lookup by file extension / 根据扩展名获取MIME类型
pub trait MimeLookup: Send + Sync {
    /// `extension` has no leading dot and may be empty
    fn lookup(&self, extension: &str) -> String;
}

/// `mime_guess` backed lookup, `application/octet-stream` when unknown
#[derive(Debug, Clone, Copy, Default)]
pub struct MimeGuessLookup;

impl MimeLookup for MimeGuessLookup {
    fn lookup(&self, extension: &str) -> String {
        mime_guess::from_ext(extension)
            .first_or_octet_stream()
            .to_string()
    }
}
