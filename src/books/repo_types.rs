use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Serde adapter for calendar dates as `YYYY-MM-DD`.
pub(crate) mod date_format {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{macros::format_description, Date};

    pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let format = format_description!("[year]-[month]-[day]");
        let formatted = date.format(&format).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let format = format_description!("[year]-[month]-[day]");
        let raw = String::deserialize(deserializer)?;
        Date::parse(&raw, &format).map_err(serde::de::Error::custom)
    }
}

/// Book record in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub uid: Uuid,
    pub title: String,
    pub author: String,
    pub publisher: String,
    #[serde(with = "date_format")]
    pub published_date: Date,
    pub page_count: i32,
    pub language: String,
    pub user_uid: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn published_date_uses_plain_calendar_format() {
        let book = Book {
            uid: Uuid::new_v4(),
            title: "The Name of the Wind".into(),
            author: "Patrick Rothfuss".into(),
            publisher: "DAW Books".into(),
            published_date: date!(2007 - 03 - 27),
            page_count: 662,
            language: "en".into(),
            user_uid: Uuid::new_v4(),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["published_date"], "2007-03-27");

        let back: Book = serde_json::from_value(json).unwrap();
        assert_eq!(back.published_date, date!(2007 - 03 - 27));
    }
}
