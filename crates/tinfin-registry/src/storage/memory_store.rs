//! In-memory token and payment records for tests and development

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use time::OffsetDateTime;
use tinfin::{RevocationError, RevocationState, RevocationStore};

use super::{PaymentStore, TokenStore};
use crate::entities::{PaymentRecord, PaymentStatus, TokenRecord};
use crate::error::{RegistryError, Result};

#[derive(Debug, Default)]
struct State {
    tokens: Vec<TokenRecord>,
    payments: HashMap<String, PaymentRecord>,
}

/// Token and payment records held in process memory
///
/// One lock guards all records, so check-and-insert is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| RegistryError::Storage("Lock poisoned".into()))
    }

    fn revoke_where<F>(&self, user_id: &str, what: &str, matches: F) -> Result<()>
    where
        F: Fn(&TokenRecord) -> bool,
    {
        let mut state = self.lock()?;
        let record = state
            .tokens
            .iter_mut()
            .find(|t| t.user_id == user_id && matches(t))
            .ok_or_else(|| RegistryError::TokenNotFound(what.to_string()))?;

        record.revoked = true;
        Ok(())
    }
}

#[async_trait]
impl RevocationStore for MemoryStore {
    async fn revocation_state(&self, jti: &str) -> std::result::Result<RevocationState, RevocationError> {
        let state = self
            .state
            .lock()
            .map_err(|_| RevocationError("Lock poisoned".into()))?;

        Ok(match state.tokens.iter().find(|t| t.jti == jti) {
            Some(record) if record.revoked => RevocationState::Revoked,
            Some(_) => RevocationState::Active,
            None => RevocationState::Unknown,
        })
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn insert_if_no_active(&self, record: &TokenRecord, now: OffsetDateTime) -> Result<()> {
        let mut state = self.lock()?;

        if state
            .tokens
            .iter()
            .any(|t| t.user_id == record.user_id && t.is_live(now))
        {
            return Err(RegistryError::ActiveTokenExists(record.user_id.clone()));
        }

        if state.tokens.iter().any(|t| t.jti == record.jti) {
            return Err(RegistryError::Storage(format!(
                "Duplicate token identifier: {}",
                record.jti
            )));
        }

        state.tokens.push(record.clone());
        Ok(())
    }

    async fn revoke_by_jti(&self, user_id: &str, jti: &str) -> Result<()> {
        self.revoke_where(user_id, jti, |t| t.jti == jti)
    }

    async fn revoke_by_id(&self, user_id: &str, id: &str) -> Result<()> {
        self.revoke_where(user_id, id, |t| t.id == id)
    }

    async fn list_unrevoked(&self, user_id: &str) -> Result<Vec<TokenRecord>> {
        let state = self.lock()?;
        // Stable sort keeps later inserts first among equal timestamps
        let mut records: Vec<_> = state
            .tokens
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id && !t.revoked)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn get_by_jti(&self, jti: &str) -> Result<Option<TokenRecord>> {
        let state = self.lock()?;
        Ok(state.tokens.iter().find(|t| t.jti == jti).cloned())
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn upsert_payment(&self, payment: &PaymentRecord) -> Result<()> {
        let mut state = self.lock()?;
        state.payments.insert(payment.id.clone(), payment.clone());
        Ok(())
    }

    async fn has_paid(&self, user_id: &str) -> Result<bool> {
        let state = self.lock()?;
        Ok(state
            .payments
            .values()
            .any(|p| p.user_id == user_id && p.status == PaymentStatus::Paid))
    }

    async fn list_payments(&self, user_id: &str) -> Result<Vec<PaymentRecord>> {
        let state = self.lock()?;
        let mut payments: Vec<_> = state
            .payments
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }
}
