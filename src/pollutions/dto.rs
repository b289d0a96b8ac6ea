use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::{Pollution, PollutionType, Reporter};
use crate::photos::to_data_url;

#[derive(Debug, Default, Deserialize)]
pub struct PollutionQuery {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub pollution_type: Option<String>,
}

/// Create/update body. Only these fields are read; an `id` or `userId`
/// sent by the client is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct PollutionForm {
    pub titre: Option<String>,
    pub lieu: Option<String>,
    #[serde(default, deserialize_with = "observation_date::deserialize")]
    pub date_observation: Option<OffsetDateTime>,
    pub type_pollution: Option<PollutionType>,
    pub description: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub photo_base64: Option<String>,
}

/// Pollution as sent to clients: the photo travels as a data URL and the
/// raw bytes and mime type are left out.
#[derive(Debug, Serialize)]
pub struct PollutionResponse {
    pub id: i64,
    pub titre: String,
    pub lieu: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub date_observation: Option<OffsetDateTime>,
    pub type_pollution: Option<String>,
    pub description: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_base64: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<i64>,
    #[serde(rename = "createdAt", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(rename = "updatedAt", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Reporter>,
}

impl From<Pollution> for PollutionResponse {
    fn from(p: Pollution) -> Self {
        let photo_base64 = p
            .photo_data
            .as_deref()
            .and_then(|data| to_data_url(data, p.photo_mime.as_deref()));
        Self {
            id: p.id,
            titre: p.title,
            lieu: p.place,
            date_observation: p.observed_at,
            type_pollution: p.pollution_type,
            description: p.description,
            latitude: p.latitude,
            longitude: p.longitude,
            photo_base64,
            user_id: p.user_id,
            created_at: p.created_at,
            updated_at: p.updated_at,
            user: None,
        }
    }
}

impl PollutionResponse {
    pub fn with_reporter(mut self, reporter: Option<Reporter>) -> Self {
        self.user = reporter;
        self
    }
}

/// Accepts RFC 3339 timestamps as well as the bare `YYYY-MM-DD` dates that
/// HTML date inputs produce.
pub mod observation_date {
    use serde::{Deserialize, Deserializer};
    use time::{
        format_description::well_known::Rfc3339, macros::format_description, Date,
        OffsetDateTime,
    };

    pub fn parse(raw: &str) -> Result<OffsetDateTime, time::error::Parse> {
        OffsetDateTime::parse(raw, &Rfc3339).or_else(|_| {
            Date::parse(raw, format_description!("[year]-[month]-[day]"))
                .map(|d| d.midnight().assume_utc())
        })
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => parse(s).map(Some).map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use time::macros::datetime;

    fn stored(photo: Option<(&[u8], &str)>) -> Pollution {
        Pollution {
            id: 3,
            title: "Sacs plastiques".into(),
            place: Some("Plage du Prado".into()),
            observed_at: Some(datetime!(2025-03-01 0:00 UTC)),
            pollution_type: Some("Plastic".into()),
            description: Some("Des sacs partout".into()),
            latitude: Some(Decimal::from_str("43.259800").unwrap()),
            longitude: Some(Decimal::from_str("5.373800").unwrap()),
            photo_data: photo.map(|(d, _)| d.to_vec()),
            photo_mime: photo.map(|(_, m)| m.to_string()),
            user_id: None,
            created_at: datetime!(2025-03-02 10:00 UTC),
            updated_at: datetime!(2025-03-02 10:00 UTC),
        }
    }

    #[test]
    fn response_replaces_bytes_with_data_url() {
        let json =
            serde_json::to_value(PollutionResponse::from(stored(Some((b"hi", "image/png")))))
                .unwrap();
        assert_eq!(json["photo_base64"], "data:image/png;base64,aGk=");
        assert!(json.get("photo_data").is_none());
        assert!(json.get("photo_mime").is_none());
        assert_eq!(json["titre"], "Sacs plastiques");
        assert_eq!(json["type_pollution"], "Plastic");
        assert_eq!(json["date_observation"], "2025-03-01T00:00:00Z");
        assert_eq!(json["latitude"], "43.259800");
    }

    #[test]
    fn response_without_photo_omits_field() {
        let json = serde_json::to_value(PollutionResponse::from(stored(None))).unwrap();
        assert!(json.get("photo_base64").is_none());
        assert!(json.get("user").is_none());
        assert!(json["userId"].is_null());
    }

    #[test]
    fn form_accepts_plain_dates_strings_and_numbers() {
        let form: PollutionForm = serde_json::from_value(serde_json::json!({
            "titre": "Fumée",
            "date_observation": "2025-06-14",
            "type_pollution": "Air",
            "latitude": "48.8566",
            "longitude": 2.3522,
            "userId": 99
        }))
        .unwrap();
        assert_eq!(form.date_observation, Some(datetime!(2025-06-14 0:00 UTC)));
        assert_eq!(form.type_pollution, Some(PollutionType::Air));
        assert_eq!(form.latitude, Some(Decimal::from_str("48.8566").unwrap()));
        assert_eq!(form.longitude, Some(Decimal::from_str("2.3522").unwrap()));
    }

    #[test]
    fn form_accepts_rfc3339_and_empty_dates() {
        let form: PollutionForm =
            serde_json::from_str(r#"{"date_observation":"2025-06-14T08:30:00+02:00"}"#).unwrap();
        assert_eq!(form.date_observation, Some(datetime!(2025-06-14 6:30 UTC)));

        let form: PollutionForm = serde_json::from_str(r#"{"date_observation":""}"#).unwrap();
        assert!(form.date_observation.is_none());
    }

    #[test]
    fn form_rejects_garbage_dates() {
        assert!(serde_json::from_str::<PollutionForm>(r#"{"date_observation":"hier"}"#).is_err());
    }
}
