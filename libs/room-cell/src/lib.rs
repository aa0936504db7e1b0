pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{AppointmentPlacement, Room, RoomAvailability, RoomError, ROOM_TYPE_SURGERY};
pub use services::RoomService;
