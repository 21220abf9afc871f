//! API request/response models for locations.

use super::{meetups::ParticipantResponse, pagination::Pagination, users::OwnerSummary};
use crate::{
    db::models::locations::{LocationCreateDBRequest, LocationDBResponse, LocationUpdateDBRequest},
    errors::Error,
    scheduling::combine_address,
    types::{LocationId, LocationImageId, MeetupId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Country used when a new location doesn't name one
pub const DEFAULT_COUNTRY: &str = "USA";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddressResponse {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LocationImageSummary {
    #[schema(value_type = String, format = "uuid")]
    pub id: LocationImageId,
    pub alt_text: Option<String>,
    /// Where to fetch the image bytes
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LocationResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: LocationId,
    pub name: String,
    pub address: AddressResponse,
    /// `"{street}, {city}, {state} {zip}"`
    pub combined_address: String,
    pub image: Option<LocationImageSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<LocationDBResponse> for LocationResponse {
    fn from(db: LocationDBResponse) -> Self {
        Self {
            combined_address: combine_address(&db.street, &db.city, &db.state, &db.zip),
            image: db.image.map(|image| LocationImageSummary {
                id: image.id,
                alt_text: image.alt_text,
                url: format!("/resources/location-images/{}", db.id),
            }),
            id: db.id,
            name: db.name,
            address: AddressResponse {
                street: db.street,
                city: db.city,
                state: db.state,
                zip: db.zip,
                country: db.country,
            },
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Just enough of a location to show where a meetup happens
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LocationSummary {
    #[schema(value_type = String, format = "uuid")]
    pub id: LocationId,
    pub name: String,
    pub combined_address: String,
}

impl From<&LocationDBResponse> for LocationSummary {
    fn from(db: &LocationDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name.clone(),
            combined_address: combine_address(&db.street, &db.city, &db.state, &db.zip),
        }
    }
}

/// A meetup coming up at a location
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpcomingMeetup {
    #[schema(value_type = String, format = "uuid")]
    pub id: MeetupId,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub owner: OwnerSummary,
    pub participants: Vec<ParticipantResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LocationDetailResponse {
    #[serde(flatten)]
    pub location: LocationResponse,
    /// Meetups starting from now on, soonest first
    pub upcoming_meetups: Vec<UpcomingMeetup>,
}

/// Query parameters for listing locations
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListLocationsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match on the location name
    pub search: Option<String>,
}

fn require(value: &str, field: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(Error::BadRequest {
            message: format!("{field} is required"),
        });
    }
    Ok(())
}

/// Text fields of the location creation form
#[derive(Debug, Clone, Default)]
pub struct LocationCreate {
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: Option<String>,
}

impl LocationCreate {
    /// Set a form field by its multipart name. Unknown fields are ignored.
    pub fn set_field(&mut self, field: &str, value: String) {
        match field {
            "name" => self.name = value,
            "street" => self.street = value,
            "city" => self.city = value,
            "state" => self.state = value,
            "zip" => self.zip = value,
            "country" => self.country = Some(value),
            _ => {}
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        require(&self.name, "Name")?;
        require(&self.street, "Street address")?;
        require(&self.city, "City")?;
        require(&self.state, "State")?;
        require(&self.zip, "ZIP code")?;
        Ok(())
    }

    pub fn into_db_request(self) -> LocationCreateDBRequest {
        let country = self
            .country
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_COUNTRY.to_string());
        LocationCreateDBRequest {
            name: self.name.trim().to_string(),
            street: self.street.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            zip: self.zip.trim().to_string(),
            country,
        }
    }
}

/// Multipart body for creating a location (documentation only)
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationCreateForm {
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    /// Defaults to `USA`
    pub country: Option<String>,
    /// JPEG, PNG or GIF, 3 MiB at most
    #[schema(value_type = Option<String>, format = Binary)]
    pub image: Option<Vec<u8>>,
    pub image_alt_text: Option<String>,
}

/// Multipart body for replacing a location's image (documentation only)
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationImageForm {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
    pub image_alt_text: Option<String>,
}

/// Partial update of a location. Omitted fields are left alone; blank ones are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LocationUpdate {
    pub name: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
}

impl LocationUpdate {
    pub fn validate(&self) -> Result<(), Error> {
        for (value, field) in [
            (&self.name, "Name"),
            (&self.street, "Street address"),
            (&self.city, "City"),
            (&self.state, "State"),
            (&self.zip, "ZIP code"),
            (&self.country, "Country"),
        ] {
            if let Some(value) = value {
                require(value, field)?;
            }
        }
        Ok(())
    }
}

impl From<LocationUpdate> for LocationUpdateDBRequest {
    fn from(update: LocationUpdate) -> Self {
        let trim = |v: Option<String>| v.map(|s| s.trim().to_string());
        Self {
            name: trim(update.name),
            street: trim(update.street),
            city: trim(update.city),
            state: trim(update.state),
            zip: trim(update.zip),
            country: trim(update.country),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> LocationCreate {
        let mut form = LocationCreate::default();
        for (field, value) in [
            ("name", "Bean Scene"),
            ("street", " 12 High St "),
            ("city", "Capital City"),
            ("state", "IL"),
            ("zip", "60601"),
            ("unexpected", "ignored"),
        ] {
            form.set_field(field, value.to_string());
        }
        form
    }

    #[test]
    fn test_create_validation_messages() {
        assert!(filled().validate().is_ok());

        let cases = [
            ("name", "Name is required"),
            ("street", "Street address is required"),
            ("city", "City is required"),
            ("state", "State is required"),
            ("zip", "ZIP code is required"),
        ];
        for (field, message) in cases {
            let mut form = filled();
            form.set_field(field, "   ".to_string());
            let err = form.validate().unwrap_err();
            assert_eq!(err.user_message(), message);
        }
    }

    #[test]
    fn test_create_defaults_country_and_trims() {
        let request = filled().into_db_request();
        assert_eq!(request.country, "USA");
        assert_eq!(request.street, "12 High St");

        let mut form = filled();
        form.set_field("country", "Canada".to_string());
        assert_eq!(form.into_db_request().country, "Canada");
    }

    #[test]
    fn test_update_rejects_blank_fields() {
        let update = LocationUpdate {
            city: Some("".to_string()),
            ..Default::default()
        };
        assert_eq!(update.validate().unwrap_err().user_message(), "City is required");

        let update = LocationUpdate {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_response_has_combined_address_and_image_url() {
        let id = uuid::Uuid::new_v4();
        let image_id = uuid::Uuid::new_v4();
        let now = Utc::now();
        let response = LocationResponse::from(LocationDBResponse {
            id,
            name: "Bean Scene".to_string(),
            street: "12 High St".to_string(),
            city: "Capital City".to_string(),
            state: "IL".to_string(),
            zip: "60601".to_string(),
            country: "USA".to_string(),
            image: Some(crate::db::models::locations::LocationImageRef {
                id: image_id,
                alt_text: None,
            }),
            created_at: now,
            updated_at: now,
        });

        assert_eq!(response.combined_address, "12 High St, Capital City, IL 60601");
        let image = response.image.unwrap();
        assert_eq!(image.id, image_id);
        assert_eq!(image.url, format!("/resources/location-images/{id}"));
    }
}
