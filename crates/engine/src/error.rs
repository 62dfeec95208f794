//! The module contains the error the engine can throw.
//!
//! The variants map onto the error kinds callers have to tell apart:
//!
//! - validation: [`InvalidInput`], [`InvalidAmount`], [`InvalidSplit`],
//!   [`SelfSettlement`]
//! - authorization: [`Forbidden`]
//! - state conflict: [`SettlementClosed`], [`Overpayment`]
//! - not found: [`KeyNotFound`]
//!
//! A duplicate idempotency key is not an error: the existing settlement is
//! returned instead.
//!
//!  [`InvalidInput`]: EngineError::InvalidInput
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidSplit`]: EngineError::InvalidSplit
//!  [`SelfSettlement`]: EngineError::SelfSettlement
//!  [`Forbidden`]: EngineError::Forbidden
//!  [`SettlementClosed`]: EngineError::SettlementClosed
//!  [`Overpayment`]: EngineError::Overpayment
//!  [`KeyNotFound`]: EngineError::KeyNotFound
use sea_orm::DbErr;
use thiserror::Error;

use crate::MoneyCents;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid split: {0}")]
    InvalidSplit(String),
    #[error("Cannot settle with yourself")]
    SelfSettlement,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Settlement closed: {0}")]
    SettlementClosed(String),
    #[error("Payment amount ({amount}) exceeds remaining balance ({remaining})")]
    Overpayment {
        amount: MoneyCents,
        remaining: MoneyCents,
    },
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Returns `true` for errors caused by the caller's input (as opposed to
    /// missing records, permissions, state or storage).
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::InvalidAmount(_)
                | Self::InvalidSplit(_)
                | Self::SelfSettlement
        )
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidSplit(a), Self::InvalidSplit(b)) => a == b,
            (Self::SelfSettlement, Self::SelfSettlement) => true,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::SettlementClosed(a), Self::SettlementClosed(b)) => a == b,
            (
                Self::Overpayment {
                    amount: a1,
                    remaining: r1,
                },
                Self::Overpayment {
                    amount: a2,
                    remaining: r2,
                },
            ) => a1 == a2 && r1 == r2,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
