//! OpenAPI documentation for the versioned JSON API at `/api/v1/*`.

use utoipa::OpenApi;

use crate::api::{handlers, models};
use crate::scheduling::{BusyLevel, Slot, SlotSummary};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::users::get_current_user,
        handlers::users::list_users,
        handlers::users::update_user_roles,
        handlers::roles::list_roles,
        handlers::locations::list_locations,
        handlers::locations::get_location,
        handlers::locations::create_location,
        handlers::locations::update_location,
        handlers::locations::replace_location_image,
        handlers::locations::delete_location,
        handlers::meetups::list_meetups,
        handlers::meetups::get_meetup,
        handlers::meetups::create_meetup,
        handlers::meetups::update_meetup,
        handlers::meetups::delete_meetup,
        handlers::meetups::join_meetup,
        handlers::meetups::leave_meetup,
        handlers::meetups::list_owner_meetups,
        handlers::topics::list_topics,
        handlers::scheduling::list_slots,
        handlers::scheduling::next_slot,
        handlers::scheduling::summarize_slot,
    ),
    components(schemas(
        models::users::CurrentUser,
        models::users::UserResponse,
        models::users::OwnerSummary,
        models::users::UserRolesUpdate,
        models::roles::RoleResponse,
        models::roles::RoleSummaryResponse,
        models::locations::AddressResponse,
        models::locations::LocationImageSummary,
        models::locations::LocationResponse,
        models::locations::LocationSummary,
        models::locations::LocationDetailResponse,
        models::locations::UpcomingMeetup,
        models::locations::LocationCreateForm,
        models::locations::LocationImageForm,
        models::locations::LocationUpdate,
        models::meetups::MeetupCreate,
        models::meetups::MeetupUpdate,
        models::meetups::MeetupResponse,
        models::meetups::MeetupListItem,
        models::meetups::MeetupDetailResponse,
        models::meetups::OwnerMeetupResponse,
        models::meetups::ParticipantResponse,
        models::topics::TopicResponse,
        models::scheduling::SlotsResponse,
        models::scheduling::NextSlotResponse,
        Slot,
        SlotSummary,
        BusyLevel,
    )),
    tags(
        (name = "meetups", description = "Explore, host, join and leave meetups"),
        (name = "locations", description = "Coffee shops and other venues. Writes are admin-only."),
        (name = "schedule", description = "Half-hour slot picker with busy-level hints"),
        (name = "users", description = "The signed-in user, plus user and role administration"),
    )
)]
pub struct V1ApiDoc;
