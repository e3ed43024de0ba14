//! Business logic services

pub mod borrowings;
pub mod email;
pub mod equipment;
pub mod fees;
pub mod guests;
pub mod ledger;
pub mod otp;
pub mod redis;
pub mod workflow;

use std::sync::Arc;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub equipment: equipment::EquipmentService,
    pub ledger: ledger::LedgerService,
    pub borrowings: borrowings::BorrowingsService,
    pub guests: guests::GuestBorrowingsService,
    pub verification: otp::GuestVerificationService,
}

impl Services {
    /// Create all services over one repository. The OTP store and notifier
    /// are chosen by the caller (Redis/SMTP in production, in-memory/log
    /// otherwise).
    pub fn new(
        repository: Repository,
        config: &AppConfig,
        otp_store: Arc<dyn otp::OtpStore>,
        notifier: Arc<dyn email::Notifier>,
    ) -> Self {
        let fees = fees::FeeEngine::new(config.borrowing.clone());
        let verification = otp::GuestVerificationService::new(otp_store, notifier.clone(), config.otp.clone());

        Self {
            equipment: equipment::EquipmentService::new(repository.clone()),
            ledger: ledger::LedgerService::new(repository.clone()),
            borrowings: borrowings::BorrowingsService::new(repository.clone(), fees.clone()),
            guests: guests::GuestBorrowingsService::new(repository, verification.clone(), notifier, fees),
            verification,
        }
    }
}
