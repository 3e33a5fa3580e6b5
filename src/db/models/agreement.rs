use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::{Date, Duration, OffsetDateTime, Time};
use uuid::Uuid;

use super::Service;

/// How long a pending appointment holds its slot before the sweeper may
/// expire it. Overridable through `BOOKING_HOLD_MINUTES`.
pub const DEFAULT_CONFIRMATION_HOLD_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "agreement_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AgreementStatus {
    Pending,
    Confirmed,
    Expired,
    Cancelled,
}

#[derive(Debug, Error)]
#[error("operation not allowed while agreement is {0:?}")]
pub struct InvalidTransition(pub AgreementStatus);

/// An appointment between a client and a technician. Instances are transient
/// value objects reconstructed per request; the database row is the single
/// source of truth once saved.
#[derive(Debug, Clone)]
pub struct Agreement {
    pub id: Uuid,
    pub date: Date,
    pub start_time: Time,
    pub service: Service,
    pub technician_id: Uuid,
    pub client_id: Uuid,
    pub client_name: String,
    pub client_email: String,
    pub salon_id: Uuid,
    pub status: AgreementStatus,
    pub confirm_token_hash: Option<String>,
    pub expires_at: Option<OffsetDateTime>,
    pub confirmed_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl Agreement {
    pub fn end_time(&self) -> Time {
        self.start_time + Duration::minutes(self.service.duration_minutes as i64)
    }

    /// Puts the agreement on hold awaiting email confirmation. Always mints a
    /// fresh token and expiry, overwriting any prior hash, so earlier
    /// confirmation links stop resolving to this agreement. Returns the raw
    /// token; only the hash is ever persisted.
    pub fn mark_pending(&mut self, now: OffsetDateTime, hold_minutes: i64) -> String {
        self.status = AgreementStatus::Pending;
        let token = generate_confirmation_token();
        self.confirm_token_hash = Some(hash_token(&token));
        self.expires_at = Some(now + Duration::minutes(hold_minutes));
        token
    }

    /// Marks the agreement confirmed. The token hash is deliberately kept so
    /// that revisiting the same confirmation link stays a successful no-op.
    pub fn confirm(&mut self, now: OffsetDateTime) -> Result<(), InvalidTransition> {
        if self.status != AgreementStatus::Pending {
            return Err(InvalidTransition(self.status));
        }
        self.status = AgreementStatus::Confirmed;
        self.confirmed_at = Some(now);
        self.expires_at = None;
        Ok(())
    }

    /// Transitions a lapsed pending agreement to expired. Returns whether the
    /// status changed: anything not pending, or pending but still within its
    /// hold, is left untouched.
    pub fn expire(&mut self, now: OffsetDateTime) -> bool {
        if self.status != AgreementStatus::Pending {
            return false;
        }
        match self.expires_at {
            Some(expires_at) if now > expires_at => {
                self.status = AgreementStatus::Expired;
                true
            }
            _ => false,
        }
    }
}

fn generate_confirmation_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Uppercase hex SHA-256 digest of the UTF-8 token bytes, the stored form of
/// a confirmation token.
pub fn hash_token(token: &str) -> String {
    hex::encode_upper(Sha256::digest(token.as_bytes()))
}
