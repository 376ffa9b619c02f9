pub mod auth;
pub mod billing;
pub mod bookings;
pub mod dashboard;
pub mod email;
pub mod geo;
pub mod grades;
pub mod invoice;
pub mod marketplace;
pub mod metrics;
pub mod profile;
pub mod reviews;
pub mod schedule;
pub mod students;
