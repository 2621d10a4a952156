pub mod availability;
pub mod bookings;
pub mod homestays;
pub mod payments;
pub mod reviews;
pub mod rooms;
pub mod users;
