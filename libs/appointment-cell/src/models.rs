use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use doctor_cell::DoctorError;
use patient_cell::PatientError;
use room_cell::RoomError;
use shared_database::SupabaseError;
use shared_models::error::AppError;

pub const STATUS_SCHEDULED: &str = "SCHEDULED";

/// First bookable hour of the day.
pub const WORKDAY_START_HOUR: u32 = 9;
/// Last bookable hour of the day, inclusive.
pub const WORKDAY_END_HOUR: u32 = 17;

pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Error)]
pub enum AppointmentError {
    #[error("Doctor is not available at this time")]
    DoctorUnavailable,

    #[error("Appointments only available between 9 AM and 5 PM")]
    OutsideWorkingHours,

    #[error(transparent)]
    Doctor(#[from] DoctorError),

    #[error(transparent)]
    Patient(#[from] PatientError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Store(#[from] SupabaseError),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::DoctorUnavailable | AppointmentError::OutsideWorkingHours => {
                AppError::ValidationError(err.to_string())
            }
            AppointmentError::Doctor(e) => e.into(),
            AppointmentError::Patient(e) => e.into(),
            AppointmentError::Room(e) => e.into(),
            AppointmentError::Store(e) => e.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub appointment_number: String,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub room_id: Option<Uuid>,
    pub room_number: Option<String>,
    pub appointment_datetime: NaiveDateTime,
    pub status: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleAppointmentQuery {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub room_id: Uuid,
    pub appointment_date_time: NaiveDateTime,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableSlotsQuery {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BookedTime {
    pub appointment_datetime: NaiveDateTime,
}

pub fn appointment_number(epoch_millis: i64) -> String {
    format!("APPT{}", epoch_millis)
}

pub fn within_working_hours(at: NaiveDateTime) -> bool {
    (WORKDAY_START_HOUR..=WORKDAY_END_HOUR).contains(&at.hour())
}

/// The hour slot a booking occupies; the unique key per doctor.
pub fn slot_of(at: NaiveDateTime) -> NaiveDateTime {
    at.date().and_time(NaiveTime::MIN) + chrono::Duration::hours(i64::from(at.hour()))
}

pub fn same_slot(a: NaiveDateTime, b: NaiveDateTime) -> bool {
    a.date() == b.date() && a.hour() == b.hour()
}

/// On-the-hour slots of `date` inside working hours that none of `booked` falls into.
pub fn free_slots(date: NaiveDate, booked: &[NaiveDateTime]) -> Vec<NaiveDateTime> {
    (WORKDAY_START_HOUR..=WORKDAY_END_HOUR)
        .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
        .filter(|slot| !booked.iter().any(|taken| same_slot(*slot, *taken)))
        .collect()
}
