//! In-memory doubles for the persistence and email collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Barrier;

use async_trait::async_trait;
use time::macros::{date, time};
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::db::models::{Agreement, AgreementStatus, Service};
use crate::db::repositories::AgreementRepository;
use crate::db::DatabaseError;
use crate::email::{ClientNotification, EmailError, EmailSender, TechNotification};

pub fn pending_agreement(now: OffsetDateTime) -> (Agreement, String) {
    let mut agreement = Agreement {
        id: Uuid::new_v4(),
        date: date!(2026 - 03 - 09),
        start_time: time!(10:00),
        service: Service {
            id: Uuid::new_v4(),
            name: "Gel polish".into(),
            duration_minutes: 45,
            max_participants: 1,
        },
        technician_id: Uuid::new_v4(),
        client_id: Uuid::new_v4(),
        client_name: "Alex".into(),
        client_email: "alex@example.com".into(),
        salon_id: Uuid::new_v4(),
        status: AgreementStatus::Pending,
        confirm_token_hash: None,
        expires_at: None,
        confirmed_at: None,
        created_at: now,
    };
    let token = agreement.mark_pending(now, 30);
    (agreement, token)
}

#[derive(Default)]
pub struct InMemoryAgreementRepository {
    rows: Mutex<HashMap<Uuid, Agreement>>,
    /// Ids whose `update` calls should fail, for partial-failure tests.
    pub fail_updates_for: Mutex<Vec<Uuid>>,
    /// When set, `confirm_if_pending` waits here before touching the row, so
    /// a race test can hold every caller at the swap until all have read.
    pub confirm_gate: Mutex<Option<Arc<Barrier>>>,
}

impl InMemoryAgreementRepository {
    pub fn insert(&self, agreement: Agreement) {
        self.rows.lock().unwrap().insert(agreement.id, agreement);
    }

    pub fn get(&self, id: Uuid) -> Agreement {
        self.rows.lock().unwrap()[&id].clone()
    }
}

#[async_trait]
impl AgreementRepository for InMemoryAgreementRepository {
    async fn save(&self, agreement: &Agreement) -> Result<Uuid, DatabaseError> {
        if agreement.status == AgreementStatus::Pending
            && (agreement.confirm_token_hash.is_none() || agreement.expires_at.is_none())
        {
            return Err(DatabaseError::InvalidInput(
                "pending agreements must carry a token hash and expiry".into(),
            ));
        }
        self.insert(agreement.clone());
        Ok(agreement.id)
    }

    async fn update(&self, agreement: &Agreement) -> Result<(), DatabaseError> {
        if self.fail_updates_for.lock().unwrap().contains(&agreement.id) {
            return Err(DatabaseError::TransactionError("injected failure".into()));
        }
        let mut rows = self.rows.lock().unwrap();
        if !rows.contains_key(&agreement.id) {
            return Err(DatabaseError::NotFound);
        }
        rows.insert(agreement.id, agreement.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Agreement>, DatabaseError> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn get_active_for_technician_on_date(
        &self,
        date: Date,
        technician_id: Uuid,
    ) -> Result<Vec<Agreement>, DatabaseError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|a| {
                a.date == date
                    && a.technician_id == technician_id
                    && matches!(a.status, AgreementStatus::Pending | AgreementStatus::Confirmed)
            })
            .cloned()
            .collect())
    }

    async fn get_expired_pending(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<Agreement>, DatabaseError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|a| {
                a.status == AgreementStatus::Pending
                    && a.expires_at.is_some_and(|expires_at| expires_at < now)
            })
            .cloned()
            .collect())
    }

    async fn get_by_confirm_token_hash(
        &self,
        hash: &str,
    ) -> Result<Option<Agreement>, DatabaseError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|a| a.confirm_token_hash.as_deref() == Some(hash))
            .cloned())
    }

    async fn confirm_if_pending(
        &self,
        id: Uuid,
        now: OffsetDateTime,
    ) -> Result<bool, DatabaseError> {
        let gate = self.confirm_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.wait().await;
        }

        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&id) {
            Some(agreement) if agreement.status == AgreementStatus::Pending => {
                agreement.status = AgreementStatus::Confirmed;
                agreement.confirmed_at = Some(now);
                agreement.expires_at = None;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(DatabaseError::NotFound),
        }
    }

    async fn cancel(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&id) {
            Some(agreement) => {
                agreement.status = AgreementStatus::Cancelled;
                Ok(())
            }
            None => Err(DatabaseError::NotFound),
        }
    }
}

#[derive(Default)]
pub struct RecordingEmailSender {
    fail: bool,
    links: AtomicUsize,
    finals: AtomicUsize,
    tech: AtomicUsize,
    client: AtomicUsize,
}

impl RecordingEmailSender {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn confirmation_links(&self) -> usize {
        self.links.load(Ordering::SeqCst)
    }

    pub fn final_confirmations(&self) -> usize {
        self.finals.load(Ordering::SeqCst)
    }

    pub fn total_sent(&self) -> usize {
        self.links.load(Ordering::SeqCst)
            + self.finals.load(Ordering::SeqCst)
            + self.tech.load(Ordering::SeqCst)
            + self.client.load(Ordering::SeqCst)
    }

    fn deliver(&self, counter: &AtomicUsize) -> Result<(), EmailError> {
        if self.fail {
            return Err(EmailError::Transport("recording sender set to fail".into()));
        }
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send_confirmation_link(&self, _to: &str, _token: &str) -> Result<(), EmailError> {
        self.deliver(&self.links)
    }

    async fn send_final_confirmation(
        &self,
        _to: &str,
        _date: Date,
        _time: Time,
    ) -> Result<(), EmailError> {
        self.deliver(&self.finals)
    }

    async fn send_tech_notification(&self, _email: &TechNotification) -> Result<(), EmailError> {
        self.deliver(&self.tech)
    }

    async fn send_client_notification(
        &self,
        _email: &ClientNotification,
    ) -> Result<(), EmailError> {
        self.deliver(&self.client)
    }
}
