pub mod access;
pub mod booking;
pub mod homestays;
pub mod ledger;
pub mod payments;
pub mod reviews;
pub mod rooms;
pub mod status;
pub mod users;
