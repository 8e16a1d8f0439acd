pub mod api_key;
pub mod booking_request;
pub mod category;
pub mod landing_page;
pub mod lead;
pub mod quotation;
pub mod trip_inquiry;
pub mod user;

pub use api_key::ApiKey;
pub use booking_request::BookingRequest;
pub use category::Category;
pub use landing_page::LandingPage;
pub use lead::Lead;
pub use quotation::Quotation;
pub use trip_inquiry::TripInquiry;
pub use user::User;
