use reqwest::Method;
use serde_json::json;
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{Inventory, PrescriptionError};

pub struct InventoryService {
    supabase: SupabaseClient,
}

impl InventoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn find_item(&self, item_code: &str, auth_token: &str) -> Result<Option<Inventory>, PrescriptionError> {
        let path = format!(
            "/rest/v1/inventory?item_code=eq.{}",
            urlencoding::encode(item_code)
        );
        let items: Vec<Inventory> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(items.into_iter().next())
    }

    pub async fn get_item(&self, item_code: &str, auth_token: &str) -> Result<Inventory, PrescriptionError> {
        self.find_item(item_code, auth_token)
            .await?
            .ok_or_else(|| PrescriptionError::MedicineNotFound(item_code.to_string()))
    }

    /// Writes `next.quantity` only if the stored quantity still equals `current.quantity`.
    async fn compare_and_set(
        &self,
        current: &Inventory,
        next: Inventory,
        auth_token: &str,
    ) -> Result<Inventory, PrescriptionError> {
        let path = format!(
            "/rest/v1/inventory?item_code=eq.{}&quantity=eq.{}",
            urlencoding::encode(&current.item_code),
            current.quantity
        );
        let updated: Vec<Inventory> = self
            .supabase
            .write_returning(Method::PATCH, &path, auth_token, json!({ "quantity": next.quantity }))
            .await?;

        if updated.is_empty() {
            warn!("Stock of {} changed concurrently", current.item_code);
            return Err(PrescriptionError::Conflict(format!(
                "Stock of {} was updated concurrently, please retry",
                current.item_code
            )));
        }

        debug!("Stock of {} now {}", next.item_code, next.quantity);
        Ok(next)
    }

    /// Takes `amount` units out of stock, guarded against concurrent stock changes.
    pub async fn decrement_stock(
        &self,
        item: &Inventory,
        amount: i32,
        auth_token: &str,
    ) -> Result<Inventory, PrescriptionError> {
        let mut next = item.clone();
        next.decrement(amount)?;
        self.compare_and_set(item, next, auth_token).await
    }

    /// Puts `amount` units back on the shelf.
    pub async fn restock_stock(
        &self,
        item: &Inventory,
        amount: i32,
        auth_token: &str,
    ) -> Result<Inventory, PrescriptionError> {
        let mut next = item.clone();
        next.restock(amount)?;
        self.compare_and_set(item, next, auth_token).await
    }
}
