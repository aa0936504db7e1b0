use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{
    CreateHistoryRequest, HistorySearchQuery, PatientError, PatientHistory, PatientSummary,
};
use crate::services::PatientService;

#[derive(Debug, Deserialize)]
struct BilledAmount {
    total_amount: f64,
}

pub struct HistoryService {
    supabase: SupabaseClient,
    patients: PatientService,
}

impl HistoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            patients: PatientService::new(config),
        }
    }

    pub async fn add_entry(
        &self,
        request: CreateHistoryRequest,
        auth_token: &str,
    ) -> Result<PatientHistory, PatientError> {
        if request.diagnosis.trim().is_empty() {
            return Err(PatientError::Validation("diagnosis is required".into()));
        }
        self.patients.get_patient(request.patient_id, auth_token).await?;

        let entry = PatientHistory {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            visit_date: request.visit_date,
            diagnosis: request.diagnosis,
            symptoms: request.symptoms,
            notes: request.notes,
        };

        let created: Vec<PatientHistory> = self
            .supabase
            .write_returning(Method::POST, "/rest/v1/patient_history", auth_token, json!(entry))
            .await?;

        info!("History entry recorded for patient {}", entry.patient_id);
        Ok(created.into_iter().next().unwrap_or(entry))
    }

    pub fn search_path(query: &HistorySearchQuery) -> String {
        let mut filters = Vec::new();

        if let Some(keyword) = query.keyword.as_deref().filter(|k| !k.trim().is_empty()) {
            let pattern = or_value(&format!("*{}*", keyword.trim()));
            let pattern = urlencoding::encode(&pattern);
            filters.push(format!(
                "or=(diagnosis.ilike.{p},symptoms.ilike.{p},notes.ilike.{p})",
                p = pattern
            ));
        }
        if let Some(patient_id) = query.patient_id {
            filters.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(from) = query.from {
            filters.push(format!("visit_date=gte.{}", from));
        }
        if let Some(to) = query.to {
            filters.push(format!("visit_date=lte.{}", to));
        }
        filters.push("order=visit_date.desc".to_string());

        format!("/rest/v1/patient_history?{}", filters.join("&"))
    }

    pub async fn search(
        &self,
        query: HistorySearchQuery,
        auth_token: &str,
    ) -> Result<Vec<PatientHistory>, PatientError> {
        debug!("Searching patient history: {:?}", query);

        if let (Some(from), Some(to)) = (query.from, query.to) {
            if from > to {
                return Err(PatientError::Validation(
                    "Search range start must not be after its end".into(),
                ));
            }
        }

        let entries: Vec<PatientHistory> = self
            .supabase
            .request(Method::GET, &Self::search_path(&query), Some(auth_token), None)
            .await?;
        Ok(entries)
    }

    pub async fn entries_for_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<PatientHistory>, PatientError> {
        let query = HistorySearchQuery {
            patient_id: Some(patient_id),
            ..Default::default()
        };
        self.search(query, auth_token).await
    }

    pub async fn summary(&self, patient_id: Uuid, auth_token: &str) -> Result<PatientSummary, PatientError> {
        self.patients.get_patient(patient_id, auth_token).await?;

        let visits_path = format!("/rest/v1/patient_history?patient_id=eq.{}&select=id", patient_id);
        let visits: Vec<Value> = self
            .supabase
            .request(Method::GET, &visits_path, Some(auth_token), None)
            .await?;

        let bills_path = format!("/rest/v1/bills?patient_id=eq.{}&select=total_amount", patient_id);
        let bills: Vec<BilledAmount> = self
            .supabase
            .request(Method::GET, &bills_path, Some(auth_token), None)
            .await?;

        Ok(PatientSummary {
            patient_id,
            visit_count: visits.len(),
            total_billed: bills.iter().map(|b| b.total_amount).sum(),
        })
    }
}

/// Quotes a value for an `or=(...)` list when it carries characters of that grammar.
fn or_value(value: &str) -> String {
    if value.contains([',', '.', ':', '(', ')', '"', '\\']) {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}
