use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::DoctorService;
use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{AppointmentPlacement, CreateRoomRequest, Room, RoomAvailability, RoomError};

pub struct RoomService {
    supabase: SupabaseClient,
    doctors: DoctorService,
}

impl RoomService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            doctors: DoctorService::new(config),
        }
    }

    async fn query(&self, path: &str, auth_token: &str) -> Result<Vec<Room>, RoomError> {
        let rooms: Vec<Room> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await?;
        Ok(rooms)
    }

    pub async fn create_room(&self, request: CreateRoomRequest, auth_token: &str) -> Result<Room, RoomError> {
        let room = Room::new(request)?;

        if self.find_by_number(&room.room_number, auth_token).await?.is_some() {
            return Err(RoomError::DuplicateNumber(room.room_number));
        }

        let created: Vec<Room> = self
            .supabase
            .write_returning(Method::POST, "/rest/v1/rooms", auth_token, json!(room))
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    RoomError::DuplicateNumber(room.room_number.clone())
                } else {
                    RoomError::Store(e)
                }
            })?;

        info!("Room {} created with capacity {}", room.room_number, room.capacity);
        Ok(created.into_iter().next().unwrap_or(room))
    }

    pub async fn list_rooms(&self, auth_token: &str) -> Result<Vec<Room>, RoomError> {
        self.query("/rest/v1/rooms?order=room_number.asc", auth_token).await
    }

    pub async fn get_room(&self, room_id: Uuid, auth_token: &str) -> Result<Room, RoomError> {
        let path = format!("/rest/v1/rooms?id=eq.{}", room_id);
        self.query(&path, auth_token)
            .await?
            .into_iter()
            .next()
            .ok_or(RoomError::NotFound)
    }

    pub async fn find_by_number(&self, room_number: &str, auth_token: &str) -> Result<Option<Room>, RoomError> {
        let path = format!(
            "/rest/v1/rooms?room_number=eq.{}",
            urlencoding::encode(room_number)
        );
        Ok(self.query(&path, auth_token).await?.into_iter().next())
    }

    pub async fn get_by_number(&self, room_number: &str, auth_token: &str) -> Result<Room, RoomError> {
        self.find_by_number(room_number, auth_token)
            .await?
            .ok_or(RoomError::NotFound)
    }

    pub async fn availability(&self, room_number: &str, auth_token: &str) -> Result<RoomAvailability, RoomError> {
        Ok(self.get_by_number(room_number, auth_token).await?.availability())
    }

    /// Writes `next` only if the stored count still equals `current`'s.
    async fn compare_and_set(&self, current: &Room, next: Room, auth_token: &str) -> Result<Room, RoomError> {
        let path = format!(
            "/rest/v1/rooms?id=eq.{}&current_patient_count=eq.{}",
            current.id, current.current_patient_count
        );
        let body = json!({
            "current_patient_count": next.current_patient_count,
            "is_occupied": next.is_occupied,
        });

        let updated: Vec<Room> = self
            .supabase
            .write_returning(Method::PATCH, &path, auth_token, body)
            .await?;

        if updated.is_empty() {
            warn!("Occupancy of room {} changed concurrently", current.room_number);
            return Err(RoomError::Conflict(format!(
                "Room {} was updated concurrently, please retry",
                current.room_number
            )));
        }

        Ok(next)
    }

    /// Takes one bed in `room`, failing when it is already full.
    pub async fn occupy(&self, room: &Room, auth_token: &str) -> Result<Room, RoomError> {
        let next = room.admitted()?;
        let occupied = self.compare_and_set(room, next, auth_token).await?;
        debug!(
            "Room {} now holds {}/{}",
            occupied.room_number, occupied.current_patient_count, occupied.capacity
        );
        Ok(occupied)
    }

    pub async fn release(&self, room: &Room, auth_token: &str) -> Result<Room, RoomError> {
        if room.current_patient_count == 0 {
            return Ok(room.clone());
        }
        self.compare_and_set(room, room.released(), auth_token).await
    }

    async fn placement(&self, appointment_id: Uuid, auth_token: &str) -> Result<AppointmentPlacement, RoomError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&select=id,doctor_id,room_id,room_number",
            appointment_id
        );
        let rows: Vec<AppointmentPlacement> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        rows.into_iter().next().ok_or(RoomError::AppointmentNotFound)
    }

    /// Frees the previous room of `placement` and points the appointment at `occupied`.
    async fn move_placement(
        &self,
        placement: &AppointmentPlacement,
        occupied: &Room,
        auth_token: &str,
    ) -> Result<(), RoomError> {
        if let Some(previous_id) = placement.room_id {
            match self.get_room(previous_id, auth_token).await {
                Ok(previous) => {
                    self.release(&previous, auth_token).await?;
                }
                Err(RoomError::NotFound) => {
                    warn!("Previous room {} of appointment {} no longer exists", previous_id, placement.id);
                }
                Err(e) => return Err(e),
            }
        }

        let path = format!("/rest/v1/appointments?id=eq.{}", placement.id);
        self.supabase
            .execute(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({
                    "room_id": occupied.id,
                    "room_number": occupied.room_number,
                })),
            )
            .await?;
        Ok(())
    }

    /// Gives back the bed taken by a failed assignment.
    async fn vacate(&self, occupied: &Room, auth_token: &str) {
        if let Err(e) = self.release(occupied, auth_token).await {
            warn!("Failed to give back bed in room {}: {}", occupied.room_number, e);
        }
    }

    /// Places an appointment in a room, moving it out of its previous room if needed.
    pub async fn assign_appointment(
        &self,
        appointment_id: Uuid,
        room_number: &str,
        auth_token: &str,
    ) -> Result<Room, RoomError> {
        debug!("Assigning appointment {} to room {}", appointment_id, room_number);

        let placement = self.placement(appointment_id, auth_token).await?;
        let room = self.get_by_number(room_number, auth_token).await?;

        if placement.room_id == Some(room.id) {
            debug!("Appointment {} already in room {}", appointment_id, room_number);
            return Ok(room);
        }

        let doctor = self.doctors.get_doctor(placement.doctor_id, auth_token).await?;
        room.check_assignable(&doctor)?;

        let occupied = self.occupy(&room, auth_token).await?;

        if let Err(e) = self.move_placement(&placement, &occupied, auth_token).await {
            self.vacate(&occupied, auth_token).await;
            return Err(e);
        }

        info!("Appointment {} assigned to room {}", appointment_id, occupied.room_number);
        Ok(occupied)
    }
}
