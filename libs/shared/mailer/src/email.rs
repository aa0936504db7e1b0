use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use shared_config::AppConfig;

/// Well-known hospital mailboxes, resolved from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailSource {
    Admin,
    Supplier,
    Hospital,
}

#[derive(Debug, Serialize)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Sends notifications through an HTTP mail relay.
///
/// Delivery is best effort: failures are logged and never returned to the caller,
/// so a booking or a bill never fails because a notification could not be sent.
pub struct EmailService {
    client: Client,
    api_url: String,
    api_key: String,
    admin_email: String,
    supplier_email: String,
    hospital_email: String,
}

impl EmailService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.mail_api_url.clone(),
            api_key: config.mail_api_key.clone(),
            admin_email: config.admin_email.clone(),
            supplier_email: config.supplier_email.clone(),
            hospital_email: config.hospital_email.clone(),
        }
    }

    pub fn address_of(&self, source: EmailSource) -> &str {
        match source {
            EmailSource::Admin => &self.admin_email,
            EmailSource::Supplier => &self.supplier_email,
            EmailSource::Hospital => &self.hospital_email,
        }
    }

    pub async fn send_to(&self, source: EmailSource, subject: &str, body: &str) {
        let to = self.address_of(source).to_string();
        self.send_email(&to, subject, body).await;
    }

    pub async fn send_email(&self, to: &str, subject: &str, body: &str) {
        if to.is_empty() {
            warn!("Skipping email '{}': no recipient address", subject);
            return;
        }

        if self.api_url.is_empty() {
            info!("Mail relay disabled, would send '{}' to {}", subject, to);
            return;
        }

        let email = OutgoingEmail {
            from: &self.hospital_email,
            to,
            subject,
            text: body,
        };

        let result = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&email)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Email '{}' sent to {}", subject, to);
            }
            Ok(response) => {
                warn!("Failed to send email '{}' to {}: relay answered {}", subject, to, response.status());
            }
            Err(e) => {
                warn!("Failed to send email '{}' to {}: {}", subject, to, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_with_relay(url: String) -> AppConfig {
        AppConfig {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            billing_hash_secret: String::new(),
            bills_directory: "bills".into(),
            prescription_audit_file: "audit.log".into(),
            mail_api_url: url,
            mail_api_key: "mail-key".to_string(),
            admin_email: "admin@hospital.com".to_string(),
            supplier_email: "supplier@example.com".to_string(),
            hospital_email: "hospital.system@gmail.com".to_string(),
            system_doctor_number: "SYSTEM".to_string(),
            port: 3000,
        }
    }

    #[tokio::test]
    async fn posts_message_to_relay() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(header("Authorization", "Bearer mail-key"))
            .and(body_partial_json(json!({
                "from": "hospital.system@gmail.com",
                "to": "admin@hospital.com",
                "subject": "New Bill Generated"
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let service = EmailService::new(&config_with_relay(format!("{}/send", server.uri())));
        service.send_to(EmailSource::Admin, "New Bill Generated", "Total: $10.00").await;
    }

    #[tokio::test]
    async fn relay_failure_is_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let service = EmailService::new(&config_with_relay(server.uri()));
        // Completes without panicking or returning an error.
        service.send_email("doctor@hospital.com", "New Appointment Scheduled", "body").await;
    }

    #[test]
    fn resolves_role_addresses() {
        let service = EmailService::new(&config_with_relay(String::new()));
        assert_eq!(service.address_of(EmailSource::Supplier), "supplier@example.com");
        assert_eq!(service.address_of(EmailSource::Hospital), "hospital.system@gmail.com");
    }
}
