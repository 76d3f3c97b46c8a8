//! Upload validation shared by the API and the client.

use validator::Validate;

use crate::error::{ModelError, ModelResult};

/// Photo extensions accepted by the upload handler.
pub const ALLOWED_PHOTO_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "heic"];

/// Maximum length of a task ID accepted on the status/result routes.
const MAX_TASK_ID_LEN: usize = 128;

/// Text fields of an upload plus the photo's original file name.
#[derive(Debug, Clone, Validate)]
pub struct UploadFields {
    #[validate(length(min = 1))]
    pub message: String,
    #[validate(email)]
    pub email: String,
    pub photo_name: String,
}

impl UploadFields {
    /// Assemble and validate the fields of an upload.
    ///
    /// Any absent or blank field yields [`ModelError::MissingFields`] before
    /// the finer-grained checks run.
    pub fn from_parts(
        photo_name: Option<String>,
        photo_len: usize,
        message: Option<String>,
        email: Option<String>,
    ) -> ModelResult<Self> {
        let message = message.filter(|m| !m.trim().is_empty());
        let email = email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty());

        let (Some(message), Some(email)) = (message, email) else {
            return Err(ModelError::MissingFields);
        };
        if photo_len == 0 {
            return Err(ModelError::MissingFields);
        }

        let fields = Self {
            message,
            email,
            photo_name: photo_name.unwrap_or_default(),
        };
        fields.check()?;
        Ok(fields)
    }

    fn check(&self) -> ModelResult<()> {
        if let Err(errors) = self.validate() {
            let field_errors = errors.field_errors();
            if field_errors.contains_key("email") {
                return Err(ModelError::InvalidEmail(self.email.clone()));
            }
            return Err(ModelError::MissingFields);
        }

        let ext = photo_extension(&self.photo_name);
        if !ALLOWED_PHOTO_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ModelError::UnsupportedPhoto(ext));
        }
        Ok(())
    }

    /// Lower-cased extension used when storing the photo.
    pub fn extension(&self) -> String {
        photo_extension(&self.photo_name)
    }
}

/// Extension of an uploaded file name, `jpg` when it has none.
pub fn photo_extension(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => "jpg".to_string(),
    }
}

/// Validate a task ID taken from a URL path.
///
/// IDs are joined onto the output directory, so only ASCII alphanumerics,
/// `-` and `_` are accepted.
pub fn is_valid_task_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_TASK_ID_LEN
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
