//! Query-string parsing and matching for asset search.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::entities::asset::{self, FileType};
use crate::error::{AppError, FieldErrors};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SearchParams {
    pub q: Option<String>,
    pub file_type: Option<FileType>,
    pub tags: Vec<String>,
    pub date_from: Option<NaiveDateTime>,
    pub date_to: Option<NaiveDateTime>,
}

impl SearchParams {
    /// Parse `q`, `file_type`, repeated `tags`, `date_from` and `date_to`.
    /// Empty values are ignored.
    pub fn from_query(raw: &str) -> Result<Self, AppError> {
        let mut params = SearchParams::default();
        let mut errors = FieldErrors::new();

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "q" => params.q = Some(value.to_string()),
                "file_type" => match FileType::parse(value) {
                    Some(kind) => params.file_type = Some(kind),
                    None => push(&mut errors, "file_type", format!("\"{}\" is not a valid file type.", value)),
                },
                "tags" | "tags[]" => params.tags.push(value.to_string()),
                "date_from" => match parse_bound(value, Bound::Start) {
                    Some(at) => params.date_from = Some(at),
                    None => push(&mut errors, "date_from", "Enter a valid date or date/time.".to_string()),
                },
                "date_to" => match parse_bound(value, Bound::End) {
                    Some(at) => params.date_to = Some(at),
                    None => push(&mut errors, "date_to", "Enter a valid date or date/time.".to_string()),
                },
                _ => {}
            }
        }

        if errors.is_empty() {
            Ok(params)
        } else {
            Err(AppError::Validation(errors))
        }
    }

    /// Text and tag criteria. Type, date and visibility are applied in SQL.
    pub fn matches(&self, asset: &asset::Model) -> bool {
        let text_ok = match &self.q {
            None => true,
            Some(q) => {
                let needle = q.to_lowercase();
                asset.title.to_lowercase().contains(&needle)
                    || asset
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
                    || asset.has_tag(q)
            }
        };

        text_ok && self.tags.iter().all(|tag| asset.has_tag(tag))
    }
}

fn push(errors: &mut FieldErrors, field: &str, message: String) {
    errors.entry(field.to_string()).or_default().push(message);
}

#[derive(Clone, Copy)]
enum Bound {
    Start,
    End,
}

/// Dates alone cover the whole day; date-times are taken as given (UTC).
fn parse_bound(value: &str, bound: Bound) -> Option<NaiveDateTime> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let time = match bound {
            Bound::Start => NaiveTime::MIN,
            Bound::End => NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999)?,
        };
        return Some(date.and_time(time));
    }
    if let Ok(at) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(at.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn asset(title: &str, description: Option<&str>, tags: &[&str]) -> asset::Model {
        let now = chrono::Utc::now().naive_utc();
        asset::Model {
            id: Uuid::new_v4(),
            owner_id: 1,
            file_key: "assets/1/x.png".to_string(),
            original_filename: "x.png".to_string(),
            file_type: FileType::Image,
            title: title.to_string(),
            description: description.map(str::to_string),
            tags: serde_json::json!(tags),
            version: 1,
            file_size: 1,
            mime_type: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn parses_repeated_tags_and_type() {
        let params = SearchParams::from_query("q=Logo&file_type=image&tags=logo&tags=2024").unwrap();
        assert_eq!(params.q.as_deref(), Some("Logo"));
        assert_eq!(params.file_type, Some(FileType::Image));
        assert_eq!(params.tags, vec!["logo".to_string(), "2024".to_string()]);
    }

    #[test]
    fn date_only_bounds_cover_whole_day() {
        let params = SearchParams::from_query("date_from=2024-03-01&date_to=2024-03-01").unwrap();
        let from = params.date_from.unwrap();
        let to = params.date_to.unwrap();
        assert_eq!(from.to_string(), "2024-03-01 00:00:00");
        assert_eq!(to.date(), from.date());
        assert!(to > from);
    }

    #[test]
    fn rejects_bad_type_and_dates() {
        let err = SearchParams::from_query("file_type=spreadsheet&date_to=yesterday").unwrap_err();
        match err {
            AppError::Validation(errors) => {
                assert!(errors.contains_key("file_type"));
                assert!(errors.contains_key("date_to"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn query_matches_title_description_or_exact_tag() {
        let params = SearchParams::from_query("q=brand").unwrap();
        assert!(params.matches(&asset("Brand guide", None, &[])));
        assert!(params.matches(&asset("Guide", Some("Our BRANDING rules"), &[])));
        assert!(params.matches(&asset("Guide", None, &["brand"])));
        assert!(!params.matches(&asset("Guide", None, &["brands"])));
    }

    #[test]
    fn every_tag_filter_must_match() {
        let params = SearchParams::from_query("tags=logo&tags=2024").unwrap();
        assert!(params.matches(&asset("a", None, &["logo", "2024", "blue"])));
        assert!(!params.matches(&asset("b", None, &["logo"])));
        assert!(!params.matches(&asset("c", None, &["2024"])));
    }
}
