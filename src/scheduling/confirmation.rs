use time::OffsetDateTime;
use tracing::error;

use crate::db::models::AgreementStatus;
use crate::db::repositories::AgreementRepository;
use crate::db::DatabaseError;
use crate::email::EmailSender;

/// What happened when a confirmation token hash was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOutcome {
    /// No agreement owns this hash.
    NotFound,
    /// The agreement was pending and is now confirmed.
    Confirmed,
    /// The agreement was already confirmed; revisiting the link is a
    /// successful no-op.
    AlreadyConfirmed,
    /// The hold had lapsed; a fresh token was minted and a new confirmation
    /// email dispatched.
    ExpiredReissued,
    /// The agreement was cancelled; terminal, nothing re-sent.
    Cancelled,
}

/// Resolves a stored token hash to a lifecycle outcome. This is the one
/// lifecycle operation that talks to the email collaborator; delivery
/// failures are logged and never undo a committed transition.
///
/// An expired-token click deliberately recovers the user: the agreement is
/// re-issued a fresh pending hold and a new confirmation email rather than
/// being rejected outright.
pub async fn resolve_token(
    repo: &dyn AgreementRepository,
    email: &dyn EmailSender,
    token_hash: &str,
    now: OffsetDateTime,
    hold_minutes: i64,
) -> Result<TokenOutcome, DatabaseError> {
    let Some(mut agreement) = repo.get_by_confirm_token_hash(token_hash).await? else {
        return Ok(TokenOutcome::NotFound);
    };

    match agreement.status {
        AgreementStatus::Pending => {
            // Storage-level compare-and-swap: two simultaneous clicks on the
            // same link must yield exactly one transition and one email.
            if !repo.confirm_if_pending(agreement.id, now).await? {
                return Ok(TokenOutcome::AlreadyConfirmed);
            }

            if let Err(err) = email
                .send_final_confirmation(&agreement.client_email, agreement.date, agreement.start_time)
                .await
            {
                error!(
                    agreement_id = %agreement.id,
                    "confirmed, but final confirmation email failed: {err}"
                );
            }
            Ok(TokenOutcome::Confirmed)
        }

        AgreementStatus::Confirmed => {
            // Idempotent resend; no state change.
            if let Err(err) = email
                .send_final_confirmation(&agreement.client_email, agreement.date, agreement.start_time)
                .await
            {
                error!(
                    agreement_id = %agreement.id,
                    "failed to re-send final confirmation email: {err}"
                );
            }
            Ok(TokenOutcome::AlreadyConfirmed)
        }

        AgreementStatus::Expired => {
            let token = agreement.mark_pending(now, hold_minutes);
            repo.update(&agreement).await?;

            if let Err(err) = email
                .send_confirmation_link(&agreement.client_email, &token)
                .await
            {
                error!(
                    agreement_id = %agreement.id,
                    "re-issued hold, but confirmation link email failed: {err}"
                );
            }
            Ok(TokenOutcome::ExpiredReissued)
        }

        AgreementStatus::Cancelled => Ok(TokenOutcome::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;
    use time::Duration;

    use crate::db::models::hash_token;
    use crate::scheduling::testing::{pending_agreement, InMemoryAgreementRepository, RecordingEmailSender};

    use super::*;

    const NOW: OffsetDateTime = datetime!(2026-03-01 12:00 UTC);

    #[tokio::test]
    async fn pending_token_confirms_and_notifies_once() {
        let repo = InMemoryAgreementRepository::default();
        let email = RecordingEmailSender::default();

        let (agreement, token) = pending_agreement(NOW);
        repo.insert(agreement.clone());
        let hash = hash_token(&token);

        let outcome = resolve_token(&repo, &email, &hash, NOW, 30).await.unwrap();
        assert_eq!(outcome, TokenOutcome::Confirmed);

        let stored = repo.get(agreement.id);
        assert_eq!(stored.status, AgreementStatus::Confirmed);
        assert_eq!(stored.confirmed_at, Some(NOW));
        assert_eq!(stored.expires_at, None);
        assert!(stored.confirm_token_hash.is_some(), "hash kept for idempotence");
        assert_eq!(email.final_confirmations(), 1);

        // second visit to the same link: no state change, polite resend
        let outcome = resolve_token(&repo, &email, &hash, NOW, 30).await.unwrap();
        assert_eq!(outcome, TokenOutcome::AlreadyConfirmed);
        assert_eq!(repo.get(agreement.id).status, AgreementStatus::Confirmed);
        assert_eq!(email.final_confirmations(), 2);
    }

    #[tokio::test]
    async fn unknown_hash_is_not_found() {
        let repo = InMemoryAgreementRepository::default();
        let email = RecordingEmailSender::default();

        let outcome = resolve_token(&repo, &email, &hash_token("nope"), NOW, 30)
            .await
            .unwrap();
        assert_eq!(outcome, TokenOutcome::NotFound);
        assert_eq!(email.total_sent(), 0);
    }

    #[tokio::test]
    async fn expired_agreement_is_reissued_with_fresh_token() {
        let repo = InMemoryAgreementRepository::default();
        let email = RecordingEmailSender::default();

        let (mut agreement, token) = pending_agreement(NOW);
        let later = NOW + Duration::minutes(45);
        assert!(agreement.expire(later));
        let old_hash = agreement.confirm_token_hash.clone().unwrap();
        repo.insert(agreement.clone());

        let outcome = resolve_token(&repo, &email, &hash_token(&token), later, 30)
            .await
            .unwrap();
        assert_eq!(outcome, TokenOutcome::ExpiredReissued);

        let stored = repo.get(agreement.id);
        assert_eq!(stored.status, AgreementStatus::Pending);
        assert_ne!(stored.confirm_token_hash.as_deref(), Some(old_hash.as_str()));
        assert_eq!(stored.expires_at, Some(later + Duration::minutes(30)));
        assert_eq!(email.confirmation_links(), 1);

        // the old link now misses: its hash was overwritten
        let outcome = resolve_token(&repo, &email, &old_hash, later, 30).await.unwrap();
        assert_eq!(outcome, TokenOutcome::NotFound);
    }

    #[tokio::test]
    async fn cancelled_agreement_is_terminal() {
        let repo = InMemoryAgreementRepository::default();
        let email = RecordingEmailSender::default();

        let (mut agreement, token) = pending_agreement(NOW);
        agreement.status = AgreementStatus::Cancelled;
        repo.insert(agreement);

        let outcome = resolve_token(&repo, &email, &hash_token(&token), NOW, 30)
            .await
            .unwrap();
        assert_eq!(outcome, TokenOutcome::Cancelled);
        assert_eq!(email.total_sent(), 0);
    }

    #[tokio::test]
    async fn email_failure_does_not_roll_back_confirmation() {
        let repo = InMemoryAgreementRepository::default();
        let email = RecordingEmailSender::failing();

        let (agreement, token) = pending_agreement(NOW);
        repo.insert(agreement.clone());

        let outcome = resolve_token(&repo, &email, &hash_token(&token), NOW, 30)
            .await
            .unwrap();
        assert_eq!(outcome, TokenOutcome::Confirmed);
        assert_eq!(repo.get(agreement.id).status, AgreementStatus::Confirmed);
    }

    #[tokio::test]
    async fn concurrent_resolution_confirms_and_notifies_exactly_once() {
        let repo = InMemoryAgreementRepository::default();
        let email = RecordingEmailSender::default();

        let (agreement, token) = pending_agreement(NOW);
        repo.insert(agreement.clone());
        let hash = hash_token(&token);

        // Hold both callers at the swap until each has read the agreement as
        // Pending, the worst-case interleaving of a double-click.
        let gate = std::sync::Arc::new(tokio::sync::Barrier::new(2));
        *repo.confirm_gate.lock().unwrap() = Some(gate);

        let (a, b) = tokio::join!(
            resolve_token(&repo, &email, &hash, NOW, 30),
            resolve_token(&repo, &email, &hash, NOW, 30),
        );
        let outcomes = [a.unwrap(), b.unwrap()];

        assert_eq!(
            outcomes.iter().filter(|o| **o == TokenOutcome::Confirmed).count(),
            1,
            "exactly one caller wins the compare-and-swap"
        );
        assert!(outcomes.contains(&TokenOutcome::AlreadyConfirmed));
        assert_eq!(repo.get(agreement.id).status, AgreementStatus::Confirmed);
        // the loser saw Pending before the swap, so it sends nothing
        assert_eq!(email.final_confirmations(), 1);
    }
}
