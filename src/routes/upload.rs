//! Multipart bodies for asset creation and update.

use axum::extract::{multipart::Field, Multipart};
use bytes::Bytes;

use crate::entities::asset::FileType;
use crate::error::{AppError, FieldErrors};

/// File part of an asset form, fully buffered.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn size(&self) -> i64 {
        self.data.len() as i64
    }

    /// Declared content type, else a guess from the filename.
    pub fn mime_type(&self) -> Option<String> {
        self.content_type
            .clone()
            .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
            .or_else(|| {
                mime_guess::from_path(&self.filename)
                    .first()
                    .map(|mime| mime.essence_str().to_string())
            })
    }
}

/// Every field an asset form may carry. Absent fields stay `None`.
#[derive(Debug, Default)]
pub struct AssetForm {
    pub file: Option<UploadedFile>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub file_type: Option<FileType>,
    pub is_active: Option<bool>,
    pub changes: Option<String>,
}

impl AssetForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = AssetForm::default();
        let mut raw_tags: Option<Vec<String>> = None;
        let mut errors = FieldErrors::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid multipart data: {}", e.body_text())))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match name.as_str() {
                "file" => {
                    let filename = field
                        .file_name()
                        .map(str::to_string)
                        .filter(|f| !f.is_empty());
                    let content_type = field.content_type().map(str::to_string);
                    let data = field.bytes().await.map_err(|e| {
                        AppError::BadRequest(format!("Failed to read file: {}", e.body_text()))
                    })?;
                    match filename {
                        Some(filename) => {
                            form.file = Some(UploadedFile {
                                filename,
                                content_type,
                                data,
                            })
                        }
                        None => push(&mut errors, "file", "The submitted data was not a file."),
                    }
                }
                "title" => form.title = Some(text(field).await?.trim().to_string()),
                "description" => form.description = Some(text(field).await?),
                "tags" | "tags[]" => raw_tags.get_or_insert_with(Vec::new).push(text(field).await?),
                "file_type" => {
                    let value = text(field).await?;
                    let value = value.trim();
                    if !value.is_empty() {
                        match FileType::parse(value) {
                            Some(kind) => form.file_type = Some(kind),
                            None => push(
                                &mut errors,
                                "file_type",
                                &format!("\"{}\" is not a valid choice.", value),
                            ),
                        }
                    }
                }
                "is_active" => {
                    let value = text(field).await?;
                    match parse_bool(&value) {
                        Some(flag) => form.is_active = Some(flag),
                        None => push(&mut errors, "is_active", "Must be a valid boolean."),
                    }
                }
                "changes" => form.changes = Some(text(field).await?),
                other => tracing::debug!(field = other, "ignoring unknown form field"),
            }
        }

        if let Some(values) = raw_tags {
            match parse_tags(values) {
                Ok(tags) => form.tags = Some(tags),
                Err(message) => push(&mut errors, "tags", &message),
            }
        }

        if errors.is_empty() {
            Ok(form)
        } else {
            Err(AppError::Validation(errors))
        }
    }

    /// Requirements for a new asset: a file and a non-empty title.
    pub fn check_create(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::new();
        if self.file.is_none() {
            push(&mut errors, "file", "No file was submitted.");
        }
        match self.title.as_deref() {
            None | Some("") => push(&mut errors, "title", "This field is required."),
            Some(title) if title.chars().count() > 255 => push(
                &mut errors,
                "title",
                "Ensure this field has no more than 255 characters.",
            ),
            _ => {}
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

async fn text(field: Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid form field: {}", e.body_text())))
}

fn push(errors: &mut FieldErrors, field: &str, message: &str) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

/// Tags arrive either as repeated parts or as a single JSON array.
pub fn parse_tags(values: Vec<String>) -> Result<Vec<String>, String> {
    if let [single] = values.as_slice() {
        let trimmed = single.trim();
        if trimmed.starts_with('[') {
            return serde_json::from_str::<Vec<String>>(trimmed)
                .map(clean_tags)
                .map_err(|_| "Expected a list of strings.".to_string());
        }
    }
    Ok(clean_tags(values))
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_tags_are_kept_in_order() {
        let tags = parse_tags(vec!["logo".into(), " 2024 ".into(), "".into()]).unwrap();
        assert_eq!(tags, vec!["logo", "2024"]);
    }

    #[test]
    fn single_json_array_is_expanded() {
        let tags = parse_tags(vec![r#"["brand", "logo"]"#.into()]).unwrap();
        assert_eq!(tags, vec!["brand", "logo"]);
        assert!(parse_tags(vec!["[1, 2".into()]).is_err());
    }

    #[test]
    fn single_plain_tag_is_not_json() {
        assert_eq!(parse_tags(vec!["logo".into()]).unwrap(), vec!["logo"]);
    }

    #[test]
    fn booleans() {
        assert_eq!(parse_bool("True"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn mime_type_falls_back_to_extension() {
        let file = UploadedFile {
            filename: "photo.PNG".into(),
            content_type: Some("application/octet-stream".into()),
            data: Bytes::from_static(b"x"),
        };
        assert_eq!(file.mime_type().as_deref(), Some("image/png"));
    }

    #[test]
    fn create_needs_file_and_title() {
        let err = AssetForm::default().check_create().unwrap_err();
        match err {
            AppError::Validation(errors) => {
                assert!(errors.contains_key("file"));
                assert!(errors.contains_key("title"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
