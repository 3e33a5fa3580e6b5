mod account_repository;
mod agreement_repository;
mod schedule_repository;
mod service_repository;

pub use account_repository::AccountRepository;
pub use agreement_repository::{AgreementRepository, PgAgreementRepository};
pub use schedule_repository::ScheduleRepository;
pub use service_repository::ServiceRepository;
