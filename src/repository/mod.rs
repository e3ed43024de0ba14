//! Repository layer
//!
//! Records live in process memory behind one async mutex. Every mutation
//! goes through [`Repository::transaction`], which gives the closure
//! exclusive access to all tables: a ledger check and the status change that
//! depends on it can never interleave with another caller.

pub mod borrowings;
pub mod equipment;
pub mod guest_borrowings;
pub mod returns;

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{BorrowingRequest, EquipmentItem, GuestBorrowingRequest, ReturnRecord},
};

/// All entity tables
#[derive(Debug, Default)]
pub struct Tables {
    pub equipment: BTreeMap<Uuid, EquipmentItem>,
    pub borrowings: BTreeMap<Uuid, BorrowingRequest>,
    pub guest_borrowings: BTreeMap<Uuid, GuestBorrowingRequest>,
    pub returns: BTreeMap<Uuid, ReturnRecord>,
}

/// Main repository struct holding the shared store
#[derive(Clone, Default)]
pub struct Repository {
    tables: Arc<Mutex<Tables>>,
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with exclusive access to every table.
    ///
    /// Closures must finish all checks that can fail before their first
    /// write, so an error never leaves a half-applied change behind.
    pub async fn transaction<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut Tables) -> AppResult<T>,
    {
        let mut tables = self.tables.lock().await;
        f(&mut tables)
    }

    /// Run a read-only closure against a consistent view
    pub async fn read<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&Tables) -> T,
    {
        let tables = self.tables.lock().await;
        f(&tables)
    }
}
