use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::DoctorService;
use patient_cell::PatientService;
use room_cell::RoomService;
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_mailer::EmailService;

use crate::models::{
    appointment_number, free_slots, same_slot, slot_of, within_working_hours, Appointment,
    AppointmentError, BookedTime, ScheduleAppointmentQuery, DATETIME_FORMAT, STATUS_SCHEDULED,
};

pub struct SchedulingService {
    supabase: SupabaseClient,
    doctors: DoctorService,
    patients: PatientService,
    rooms: RoomService,
    mailer: EmailService,
}

impl SchedulingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            doctors: DoctorService::new(config),
            patients: PatientService::new(config),
            rooms: RoomService::new(config),
            mailer: EmailService::new(config),
        }
    }

    async fn booked_times(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<NaiveDateTime>, AppointmentError> {
        let day_start = date.and_time(chrono::NaiveTime::MIN);
        let next_day = day_start + Duration::days(1);
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appointment_datetime=gte.{}&appointment_datetime=lt.{}&select=appointment_datetime",
            doctor_id,
            day_start.format(DATETIME_FORMAT),
            next_day.format(DATETIME_FORMAT)
        );

        let rows: Vec<BookedTime> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(rows.into_iter().map(|r| r.appointment_datetime).collect())
    }

    pub async fn doctor_has_appointment_at(
        &self,
        doctor_id: Uuid,
        at: NaiveDateTime,
        auth_token: &str,
    ) -> Result<bool, AppointmentError> {
        let booked = self.booked_times(doctor_id, at.date(), auth_token).await?;
        Ok(booked.iter().any(|taken| same_slot(*taken, at)))
    }

    pub async fn schedule_appointment(
        &self,
        request: ScheduleAppointmentQuery,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let at = request.appointment_date_time;
        debug!(
            "Scheduling doctor {} with patient {} in room {} at {}",
            request.doctor_id, request.patient_id, request.room_id, at
        );

        let doctor = self.doctors.get_doctor(request.doctor_id, auth_token).await?;
        self.patients.get_patient(request.patient_id, auth_token).await?;

        if self.doctor_has_appointment_at(doctor.id, at, auth_token).await? {
            return Err(AppointmentError::DoctorUnavailable);
        }

        let room = self.rooms.get_room(request.room_id, auth_token).await?;
        room.check_assignable(&doctor)?;

        if !within_working_hours(at) {
            return Err(AppointmentError::OutsideWorkingHours);
        }

        let appointment = Appointment {
            id: Uuid::new_v4(),
            appointment_number: appointment_number(Utc::now().timestamp_millis()),
            doctor_id: doctor.id,
            patient_id: request.patient_id,
            room_id: Some(room.id),
            room_number: Some(room.room_number.clone()),
            appointment_datetime: at,
            status: STATUS_SCHEDULED.to_string(),
            description: request.description,
        };

        let mut row = json!(appointment);
        row["appointment_slot"] = json!(slot_of(at).format(DATETIME_FORMAT).to_string());

        // (doctor_id, appointment_slot) is unique in the store; a 409 means another booking won.
        let created: Vec<Appointment> = self
            .supabase
            .write_returning(Method::POST, "/rest/v1/appointments", auth_token, row)
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    AppointmentError::DoctorUnavailable
                } else {
                    AppointmentError::Store(e)
                }
            })?;
        let appointment = created.into_iter().next().unwrap_or(appointment);

        if let Err(e) = self.rooms.occupy(&room, auth_token).await {
            self.discard(appointment.id, auth_token).await;
            return Err(e.into());
        }

        self.mailer
            .send_email(
                &doctor.email,
                "New Appointment Scheduled",
                &format!("You have a new appointment on {}", at.format(DATETIME_FORMAT)),
            )
            .await;

        info!(
            "Appointment {} scheduled for doctor {} in room {}",
            appointment.appointment_number, doctor.doctor_number, room.room_number
        );
        Ok(appointment)
    }

    async fn discard(&self, appointment_id: Uuid, auth_token: &str) {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        if let Err(e) = self
            .supabase
            .execute(Method::DELETE, &path, Some(auth_token), None)
            .await
        {
            warn!("Failed to roll back appointment {}: {}", appointment_id, e);
        }
    }

    pub async fn available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<NaiveDateTime>, AppointmentError> {
        self.doctors.get_doctor(doctor_id, auth_token).await?;
        let booked = self.booked_times(doctor_id, date, auth_token).await?;
        Ok(free_slots(date, &booked))
    }

    pub async fn doctor_appointments(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.doctors.get_doctor(doctor_id, auth_token).await?;
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&order=appointment_datetime.asc",
            doctor_id
        );
        let appointments: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(appointments)
    }

    pub async fn patient_appointments(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.patients.get_patient(patient_id, auth_token).await?;
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&order=appointment_datetime.asc",
            patient_id
        );
        let appointments: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(appointments)
    }
}
