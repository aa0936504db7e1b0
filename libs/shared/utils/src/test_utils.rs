use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub billing_hash_secret: String,
    pub bills_directory: PathBuf,
    pub prescription_audit_file: PathBuf,
    pub mail_api_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        let data_dir = std::env::temp_dir().join("hospital-tests");
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            billing_hash_secret: "test-billing-secret".to_string(),
            bills_directory: data_dir.join("bills"),
            prescription_audit_file: data_dir.join("prescriptions").join("audit.log"),
            mail_api_url: String::new(),
        }
    }
}

impl TestConfig {
    /// Points the store client at a mock server.
    pub fn with_supabase(mut self, url: impl Into<String>) -> Self {
        self.supabase_url = url.into();
        self
    }

    /// Places bills and the prescription audit file under `dir`.
    pub fn with_data_dir(mut self, dir: &Path) -> Self {
        self.bills_directory = dir.join("bills");
        self.prescription_audit_file = dir.join("prescriptions").join("audit.log");
        self
    }

    pub fn with_mail_api(mut self, url: impl Into<String>) -> Self {
        self.mail_api_url = url.into();
        self
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            billing_hash_secret: self.billing_hash_secret.clone(),
            bills_directory: self.bills_directory.clone(),
            prescription_audit_file: self.prescription_audit_file.clone(),
            mail_api_url: self.mail_api_url.clone(),
            mail_api_key: "test-mail-key".to_string(),
            admin_email: "admin@hospital.com".to_string(),
            supplier_email: "supplier@example.com".to_string(),
            hospital_email: "hospital.system@gmail.com".to_string(),
            system_doctor_number: "SYSTEM".to_string(),
            port: 3000,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("staff@hospital.com", "staff")
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({ "alg": "HS256", "typ": "JWT" });
        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let signing_input = format!(
            "{}.{}",
            general_purpose::URL_SAFE_NO_PAD.encode(header.to_string()),
            general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string())
        );

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}.{}", signing_input, signature)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    /// Bearer header value for `config`'s secret.
    pub fn bearer_for(config: &TestConfig) -> String {
        format!(
            "Bearer {}",
            Self::create_test_token(&TestUser::default(), &config.jwt_secret, None)
        )
    }
}

/// Canned PostgREST rows for each hospital table.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn patient_row(id: &str, patient_number: &str) -> Value {
        json!({
            "id": id,
            "patient_number": patient_number,
            "first_name": "Jane",
            "last_name": "Doe",
            "date_of_birth": "1985-04-12",
            "gender": "F",
            "address": "12 Harbour Road",
            "phone_number": "0612345678",
            "email": "jane.doe@example.com"
        })
    }

    pub fn doctor_row(id: &str, doctor_number: &str, specialization: &str) -> Value {
        json!({
            "id": id,
            "doctor_number": doctor_number,
            "first_name": "Gregory",
            "last_name": "House",
            "specialization": specialization,
            "department": "Diagnostics",
            "phone_number": "0698765432",
            "email": format!("{}@hospital.com", doctor_number.to_lowercase())
        })
    }

    pub fn room_row(id: &str, room_number: &str, room_type: &str, capacity: i32, count: i32) -> Value {
        json!({
            "id": id,
            "room_number": room_number,
            "floor": 1,
            "room_type": room_type,
            "capacity": capacity,
            "current_patient_count": count,
            "is_occupied": count >= capacity
        })
    }

    pub fn appointment_row(
        id: &str,
        doctor_id: &str,
        patient_id: &str,
        appointment_datetime: &str,
        room: Option<(&str, &str)>,
    ) -> Value {
        json!({
            "id": id,
            "appointment_number": format!("APPT{}", Utc::now().timestamp_millis()),
            "doctor_id": doctor_id,
            "patient_id": patient_id,
            "room_id": room.map(|(room_id, _)| room_id),
            "room_number": room.map(|(_, number)| number),
            "appointment_datetime": appointment_datetime,
            "status": "SCHEDULED",
            "description": "Consultation"
        })
    }

    pub fn insurance_row(policy_number: &str, patient_id: &str, pct: f64, max: f64, expiry: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "policy_number": policy_number,
            "patient_id": patient_id,
            "provider": "Mutual Health",
            "coverage_percentage": pct,
            "max_coverage": max,
            "expiry_date": expiry
        })
    }

    pub fn history_row(patient_id: &str, visit_date: &str, diagnosis: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "patient_id": patient_id,
            "visit_date": visit_date,
            "diagnosis": diagnosis,
            "symptoms": "fever, cough",
            "notes": null
        })
    }

    pub fn medical_act_row(name: &str, price: f64) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "name": name,
            "price": price
        })
    }

    pub fn bill_row(bill_number: &str, patient_id: &str, doctor_id: &str, total: f64, status: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "bill_number": bill_number,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "bill_date": "2024-03-01T10:00:00Z",
            "total_amount": total,
            "status": status,
            "integrity_hash": null,
            "integrity_salt": null
        })
    }

    pub fn prescription_row(prescription_number: &str, patient_id: &str, codes: &[&str], total: f64) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "prescription_number": prescription_number,
            "patient_id": patient_id,
            "medicine_codes": codes,
            "notes": null,
            "total_cost": total,
            "is_billed": false,
            "inventory_updated": false,
            "created_at": "2024-03-01T10:00:00Z",
            "modified_at": "2024-03-01T10:00:00Z"
        })
    }

    pub fn inventory_row(item_code: &str, quantity: i32, unit_price: f64, reorder_level: i32) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "item_code": item_code,
            "name": format!("Medicine {}", item_code),
            "quantity": quantity,
            "unit_price": unit_price,
            "reorder_level": reorder_level,
            "last_restocked": null
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_points_data_files_at_directory() {
        let dir = std::path::Path::new("/tmp/ward");
        let config = TestConfig::default()
            .with_supabase("http://127.0.0.1:9999")
            .with_data_dir(dir)
            .to_app_config();

        assert_eq!(config.supabase_url, "http://127.0.0.1:9999");
        assert_eq!(config.bills_directory, dir.join("bills"));
        assert_eq!(config.prescription_audit_file, dir.join("prescriptions/audit.log"));
        assert!(!config.is_mail_configured());
    }

    #[test]
    fn test_user_maps_to_user_model() {
        let staff = TestUser::doctor("doc@hospital.com");
        let user = staff.to_user();
        assert_eq!(user.id, staff.id);
        assert!(user.has_role("doctor"));
    }

    #[test]
    fn room_row_derives_occupancy() {
        let full = MockSupabaseResponses::room_row("r1", "101", "STANDARD", 2, 2);
        assert_eq!(full["is_occupied"], json!(true));
    }
}
