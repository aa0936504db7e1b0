use std::env;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub billing_hash_secret: String,
    pub bills_directory: PathBuf,
    pub prescription_audit_file: PathBuf,
    pub mail_api_url: String,
    pub mail_api_key: String,
    pub admin_email: String,
    pub supplier_email: String,
    pub hospital_email: String,
    pub system_doctor_number: String,
    pub port: u16,
}

fn required(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", key);
        String::new()
    })
}

fn with_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        warn!("{} not set, using default {}", key, default);
        default.to_string()
    })
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let config = Self {
            supabase_url: required("SUPABASE_URL"),
            supabase_anon_key: required("SUPABASE_ANON_PUBLIC_KEY"),
            supabase_jwt_secret: required("SUPABASE_JWT_SECRET"),
            billing_hash_secret: required("BILLING_HASH_SECRET"),
            bills_directory: PathBuf::from(with_default("BILLS_DIRECTORY", "data/bills")),
            prescription_audit_file: PathBuf::from(with_default(
                "PRESCRIPTION_AUDIT_FILE",
                "data/prescriptions/audit.log",
            )),
            mail_api_url: required("MAIL_API_URL"),
            mail_api_key: required("MAIL_API_KEY"),
            admin_email: with_default("ADMIN_EMAIL", "admin@hospital.com"),
            supplier_email: with_default("SUPPLIER_EMAIL", "supplier@example.com"),
            hospital_email: with_default("HOSPITAL_EMAIL", "hospital.system@gmail.com"),
            system_doctor_number: with_default("SYSTEM_DOCTOR_NUMBER", "SYSTEM"),
            port,
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        if !config.is_mail_configured() {
            warn!("Mail API not configured - notifications will only be logged");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
            && !self.billing_hash_secret.is_empty()
    }

    pub fn is_mail_configured(&self) -> bool {
        !self.mail_api_url.is_empty()
    }
}
