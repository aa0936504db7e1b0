pub mod room;

pub use room::RoomService;
