pub mod availability;
pub mod booking;
pub mod homestay;
pub mod page;
pub mod payment;
pub mod review;
pub mod room;
pub mod user;

pub use availability::{AvailabilityDay, AvailabilityStatus, BulkAvailabilityRequest, SetOverrideRequest};
pub use booking::{
    Booking, BookingDetail, BookingFilter, BookingRoom, BookingStatus, CreateBookingRequest,
    GuestInfo, RoomRequest,
};
pub use homestay::{
    CreateHomestayRequest, Homestay, HomestayFilter, HomestayStats, HomestayStatus,
    UpdateHomestayRequest,
};
pub use page::{Page, Pagination};
pub use payment::{CreatePaymentRequest, Payment, PaymentStatus};
pub use review::{CreateReviewRequest, Review, ReviewSummary};
pub use room::{
    CreateRoomRequest, PriceType, Room, RoomFilter, RoomStats, UpdateRoomRequest, MAX_CAPACITY,
    MAX_PRICE,
};
pub use user::{Actor, Capability, CreateUserRequest, Role, User};
