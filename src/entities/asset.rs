use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "assets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: i32,
    pub file_key: String,
    pub original_filename: String,
    pub file_type: FileType,
    pub title: String,
    pub description: Option<String>,
    pub tags: Json,
    pub version: i32,
    pub file_size: i64,
    pub mime_type: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Model {
    /// Tags in stored order. Non-string entries are skipped.
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_array()
            .map(|tags| {
                tags.iter()
                    .filter_map(|tag| tag.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_tag(&self, wanted: &str) -> bool {
        self.tags
            .as_array()
            .is_some_and(|tags| tags.iter().any(|tag| tag.as_str() == Some(wanted)))
    }

    /// Lower-cased extension of the stored blob, with the leading dot.
    pub fn file_extension(&self) -> String {
        extension_of(&self.file_key)
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default()
    }
}

#[derive(
    EnumIter,
    DeriveActiveEnum,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Deserialize,
    Serialize,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    #[sea_orm(string_value = "image")]
    Image,
    #[sea_orm(string_value = "video")]
    Video,
    #[sea_orm(string_value = "pdf")]
    Pdf,
    #[sea_orm(string_value = "doc")]
    Doc,
    #[sea_orm(string_value = "audio")]
    Audio,
    #[sea_orm(string_value = "other")]
    Other,
}

impl FileType {
    pub const ALL: [FileType; 6] = [
        FileType::Image,
        FileType::Video,
        FileType::Pdf,
        FileType::Doc,
        FileType::Audio,
        FileType::Other,
    ];

    /// Classify a filename by its extension, ignoring case.
    pub fn infer(filename: &str) -> Self {
        match extension_of(filename).as_deref() {
            Some("jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp") => FileType::Image,
            Some("mp4" | "avi" | "mov" | "wmv" | "flv") => FileType::Video,
            Some("pdf") => FileType::Pdf,
            Some("doc" | "docx" | "txt" | "rtf") => FileType::Doc,
            Some("mp3" | "wav" | "ogg") => FileType::Audio,
            _ => FileType::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Image => "image",
            FileType::Video => "video",
            FileType::Pdf => "pdf",
            FileType::Doc => "doc",
            FileType::Audio => "audio",
            FileType::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .filter(|ext| !ext.is_empty())
        .map(str::to_ascii_lowercase)
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,
    #[sea_orm(has_many = "super::metadata::Entity")]
    Metadata,
    #[sea_orm(has_many = "super::asset_version::Entity")]
    Version,
    #[sea_orm(has_many = "super::activity_log::Entity")]
    ActivityLog,
    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::metadata::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Metadata.def()
    }
}

impl Related<super::asset_version::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Version.def()
    }
}

impl Related<super::activity_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ActivityLog.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset_with_tags(tags: Json) -> Model {
        let now = chrono::Utc::now().naive_utc();
        Model {
            id: Uuid::new_v4(),
            owner_id: 1,
            file_key: "assets/1/abc.JPG".to_string(),
            original_filename: "holiday.JPG".to_string(),
            file_type: FileType::Image,
            title: "Holiday".to_string(),
            description: None,
            tags,
            version: 1,
            file_size: 10,
            mime_type: Some("image/jpeg".to_string()),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn infers_image_from_upper_case_extension() {
        assert_eq!(FileType::infer("photo.PNG"), FileType::Image);
        assert_eq!(FileType::infer("scan.JpEg"), FileType::Image);
    }

    #[test]
    fn infers_every_category() {
        assert_eq!(FileType::infer("clip.mov"), FileType::Video);
        assert_eq!(FileType::infer("report.pdf"), FileType::Pdf);
        assert_eq!(FileType::infer("notes.docx"), FileType::Doc);
        assert_eq!(FileType::infer("readme.txt"), FileType::Doc);
        assert_eq!(FileType::infer("song.ogg"), FileType::Audio);
        assert_eq!(FileType::infer("archive.zip"), FileType::Other);
        assert_eq!(FileType::infer("Makefile"), FileType::Other);
        assert_eq!(FileType::infer("trailing."), FileType::Other);
    }

    #[test]
    fn parse_rejects_unknown_types() {
        assert_eq!(FileType::parse("pdf"), Some(FileType::Pdf));
        assert_eq!(FileType::parse("spreadsheet"), None);
    }

    #[test]
    fn tags_are_matched_exactly() {
        let asset = asset_with_tags(serde_json::json!(["logo", "2024", 7]));
        assert!(asset.has_tag("logo"));
        assert!(!asset.has_tag("Logo"));
        assert!(!asset.has_tag("log"));
        assert_eq!(asset.tag_list(), vec!["logo".to_string(), "2024".to_string()]);
    }

    #[test]
    fn extension_is_lower_cased() {
        let asset = asset_with_tags(serde_json::json!([]));
        assert_eq!(asset.file_extension(), ".jpg");
    }
}
