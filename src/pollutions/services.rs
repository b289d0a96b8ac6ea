use super::dto::{PollutionForm, PollutionQuery};
use super::repo_types::{NewPollution, PollutionChanges, PollutionFilter, PollutionType};
use crate::photos::{parse_data_url, DecodedPhoto};

pub const EMPTY_TITLE: &str = "Titre ne peut pas être vide!";

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Normalizes `?q=&type=` into a repository filter. A non-blank search term
/// is matched as given, surrounding spaces included. Known type labels are
/// canonicalized; anything else is compared verbatim.
pub fn build_filter(query: &PollutionQuery) -> PollutionFilter {
    let pollution_type = non_blank(query.pollution_type.as_deref()).map(|raw| {
        raw.parse::<PollutionType>()
            .map(|t| t.as_str().to_string())
            .unwrap_or(raw)
    });
    PollutionFilter {
        search: query.q.clone().filter(|q| !q.trim().is_empty()),
        pollution_type,
    }
}

/// Returns the title, or the empty-title message.
pub fn require_title(form: &PollutionForm) -> Result<String, &'static str> {
    non_blank(form.titre.as_deref()).ok_or(EMPTY_TITLE)
}

fn decode_photo(form: &PollutionForm) -> Option<DecodedPhoto> {
    form.photo_base64
        .as_deref()
        .filter(|raw| !raw.is_empty())
        .and_then(parse_data_url)
}

pub fn new_pollution(
    title: String,
    form: PollutionForm,
    owner: Option<i64>,
) -> NewPollution {
    let photo = decode_photo(&form);
    NewPollution {
        title,
        place: form.lieu,
        observed_at: form.date_observation,
        pollution_type: form.type_pollution,
        description: form.description,
        latitude: form.latitude,
        longitude: form.longitude,
        photo,
        user_id: owner,
    }
}

pub fn pollution_changes(title: String, form: PollutionForm) -> PollutionChanges {
    let photo = decode_photo(&form);
    PollutionChanges {
        title,
        place: form.lieu,
        observed_at: form.date_observation,
        pollution_type: form.type_pollution,
        description: form.description,
        latitude: form.latitude,
        longitude: form.longitude,
        photo,
    }
}
