use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use doctor_cell::{Doctor, DoctorError};
use shared_database::SupabaseError;
use shared_models::error::AppError;

pub const ROOM_TYPE_SURGERY: &str = "SURGERY";

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Room not found")]
    NotFound,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Room is at full capacity")]
    AtCapacity,

    #[error("Only surgeons can use surgery rooms")]
    SurgeonRequired,

    #[error("Room number {0} already exists")]
    DuplicateNumber(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Doctor(#[from] DoctorError),

    #[error(transparent)]
    Store(#[from] SupabaseError),
}

impl From<RoomError> for AppError {
    fn from(err: RoomError) -> Self {
        match err {
            RoomError::NotFound | RoomError::AppointmentNotFound => AppError::NotFound(err.to_string()),
            RoomError::AtCapacity
            | RoomError::SurgeonRequired
            | RoomError::DuplicateNumber(_)
            | RoomError::Validation(_) => AppError::ValidationError(err.to_string()),
            RoomError::Conflict(msg) => AppError::Conflict(msg),
            RoomError::Doctor(e) => e.into(),
            RoomError::Store(e) => e.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub room_number: String,
    pub floor: i32,
    pub room_type: String,
    pub capacity: i32,
    pub current_patient_count: i32,
    pub is_occupied: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub room_number: String,
    #[serde(default)]
    pub floor: i32,
    pub room_type: String,
    pub capacity: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomAvailability {
    pub room_number: String,
    pub capacity: i32,
    pub current_patient_count: i32,
    pub can_accept_patient: bool,
}

/// The room-related columns of an appointment row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentPlacement {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub room_id: Option<Uuid>,
    pub room_number: Option<String>,
}

impl Room {
    pub fn new(request: CreateRoomRequest) -> Result<Self, RoomError> {
        if request.room_number.trim().is_empty() {
            return Err(RoomError::Validation("room_number is required".into()));
        }
        if request.room_type.trim().is_empty() {
            return Err(RoomError::Validation("room_type is required".into()));
        }
        if request.capacity < 1 {
            return Err(RoomError::Validation("Room capacity must be at least 1".into()));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            room_number: request.room_number,
            floor: request.floor,
            room_type: request.room_type.to_uppercase(),
            capacity: request.capacity,
            current_patient_count: 0,
            is_occupied: false,
        })
    }

    pub fn is_surgery(&self) -> bool {
        self.room_type.eq_ignore_ascii_case(ROOM_TYPE_SURGERY)
    }

    pub fn can_accept_patient(&self) -> bool {
        self.current_patient_count < self.capacity && !self.is_occupied
    }

    /// Capacity first, then the surgery-room restriction.
    pub fn check_assignable(&self, doctor: &Doctor) -> Result<(), RoomError> {
        if !self.can_accept_patient() {
            return Err(RoomError::AtCapacity);
        }
        if self.is_surgery() && !doctor.is_surgeon() {
            return Err(RoomError::SurgeonRequired);
        }
        Ok(())
    }

    /// Room state after taking one more patient. Never exceeds capacity.
    pub fn admitted(&self) -> Result<Room, RoomError> {
        if !self.can_accept_patient() {
            return Err(RoomError::AtCapacity);
        }
        let mut next = self.clone();
        next.current_patient_count += 1;
        next.is_occupied = next.current_patient_count >= next.capacity;
        Ok(next)
    }

    pub fn released(&self) -> Room {
        let mut next = self.clone();
        next.current_patient_count = (next.current_patient_count - 1).max(0);
        next.is_occupied = next.current_patient_count >= next.capacity;
        next
    }

    pub fn availability(&self) -> RoomAvailability {
        RoomAvailability {
            room_number: self.room_number.clone(),
            capacity: self.capacity,
            current_patient_count: self.current_patient_count,
            can_accept_patient: self.can_accept_patient(),
        }
    }
}
