//! Shared fixtures: an in-memory clinic backend behind the handler
//! interface, and tracing setup.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Datelike, Days, NaiveDate, Weekday};
use clinic_audit::{AuditEntry, AuditError, LedgerStorage, MemoryStorage};
use clinic_core::{ActionHandler, HandlerError};
use clinic_runtime::ClinicalHandlers;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("clinic_runtime=debug,clinic_audit=debug,clinic_resolver=debug")
        .with_test_writer()
        .try_init();
}

pub fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

struct Patient {
    id: &'static str,
    name: &'static str,
    date_of_birth: &'static str,
    eligible: bool,
}

const PATIENTS: &[Patient] = &[
    Patient {
        id: "P001",
        name: "Ravi Kumar",
        date_of_birth: "1985-03-15",
        eligible: true,
    },
    Patient {
        id: "P002",
        name: "Priya Sharma",
        date_of_birth: "1990-07-22",
        eligible: true,
    },
    Patient {
        id: "P003",
        name: "Amit Patel",
        date_of_birth: "1978-11-30",
        eligible: false,
    },
];

/// Fake scheduling backend with three patients and an appointment book.
#[derive(Default)]
pub struct MockBackend {
    bookings: Mutex<HashMap<String, String>>,
    invocations: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Handler invocations across all operations.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub fn booked(&self, slot_id: &str) -> Option<String> {
        self.bookings.lock().unwrap().get(slot_id).cloned()
    }

    pub fn handlers(self: &Arc<Self>) -> ClinicalHandlers {
        let handler = |op| -> Arc<dyn ActionHandler> {
            Arc::new(BackendHandler {
                backend: self.clone(),
                op,
            })
        };
        ClinicalHandlers {
            search_patient: handler(Op::Search),
            check_insurance_eligibility: handler(Op::Insurance),
            find_available_slots: handler(Op::Slots),
            book_appointment: handler(Op::Book),
        }
    }

    fn patient(&self, id: &str) -> Result<&'static Patient, HandlerError> {
        PATIENTS
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| HandlerError::NotFound(format!("Patient {} not found", id)))
    }

    fn search(&self, query: &str) -> Result<Value, HandlerError> {
        let lower = query.to_lowercase();
        PATIENTS
            .iter()
            .find(|p| p.id.eq_ignore_ascii_case(query) || p.name.to_lowercase().contains(&lower))
            .map(|p| {
                json!({
                    "patient_id": p.id,
                    "name": p.name,
                    "date_of_birth": p.date_of_birth,
                })
            })
            .ok_or_else(|| HandlerError::NotFound(format!("No patient matches '{}'", query)))
    }

    fn insurance(&self, patient_id: &str, service_type: &str) -> Result<Value, HandlerError> {
        let patient = self.patient(patient_id)?;
        Ok(json!({
            "patient_id": patient.id,
            "is_eligible": patient.eligible,
            "insurance_provider": "National Health Insurance",
            "copay_amount": if service_type == "cardiology" { 500.0 } else { 200.0 },
        }))
    }

    fn slots(&self, specialty: &str, start: &str) -> Result<Value, HandlerError> {
        let mut date = NaiveDate::parse_from_str(start, "%Y-%m-%d")
            .map_err(|_| HandlerError::InvalidInput(format!("bad date '{}'", start)))?;
        let prefix: String = specialty.chars().take(3).collect::<String>().to_uppercase();

        let mut slots = Vec::new();
        while slots.len() < 4 {
            if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                for hour in [9, 11, 14, 16] {
                    slots.push(format!("SLOT_{}_{}{:02}", prefix, date.format("%Y%m%d"), hour));
                }
            }
            date = date
                .checked_add_days(Days::new(1))
                .ok_or_else(|| HandlerError::InvalidInput("date out of range".into()))?;
        }
        Ok(json!({ "specialty": specialty, "slots": slots }))
    }

    fn book(&self, patient_id: &str, slot_id: &str) -> Result<Value, HandlerError> {
        self.patient(patient_id)?;
        let mut bookings = self
            .bookings
            .lock()
            .map_err(|e| HandlerError::Internal(e.to_string()))?;
        if bookings.contains_key(slot_id) {
            return Err(HandlerError::Conflict(format!(
                "Slot {} is already booked",
                slot_id
            )));
        }
        bookings.insert(slot_id.to_string(), patient_id.to_string());
        Ok(json!({
            "patient_id": patient_id,
            "slot_id": slot_id,
            "status": "scheduled",
        }))
    }
}

#[derive(Clone, Copy)]
enum Op {
    Search,
    Insurance,
    Slots,
    Book,
}

struct BackendHandler {
    backend: Arc<MockBackend>,
    op: Op,
}

fn text<'a>(arguments: &'a Map<String, Value>, key: &str) -> &'a str {
    arguments.get(key).and_then(Value::as_str).unwrap_or_default()
}

#[async_trait]
impl ActionHandler for BackendHandler {
    async fn call(&self, arguments: &Map<String, Value>) -> Result<Value, HandlerError> {
        self.backend.invocations.fetch_add(1, Ordering::SeqCst);
        match self.op {
            Op::Search => self.backend.search(text(arguments, "query")),
            Op::Insurance => self
                .backend
                .insurance(text(arguments, "patient_id"), text(arguments, "service_type")),
            Op::Slots => self
                .backend
                .slots(text(arguments, "specialty"), text(arguments, "date_range_start")),
            Op::Book => self
                .backend
                .book(text(arguments, "patient_id"), text(arguments, "slot_id")),
        }
    }
}

/// Reports the backend unavailable a fixed number of times, then succeeds.
pub struct FlakyHandler {
    failures_left: AtomicU32,
    attempts: AtomicU32,
}

impl FlakyHandler {
    pub fn new(failures: u32) -> Arc<Self> {
        Arc::new(Self {
            failures_left: AtomicU32::new(failures),
            attempts: AtomicU32::new(0),
        })
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActionHandler for FlakyHandler {
    async fn call(&self, _arguments: &Map<String, Value>) -> Result<Value, HandlerError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(HandlerError::Unavailable("connection refused".into()));
        }
        Ok(json!({"ok": true}))
    }
}

/// Ledger storage that accepts a fixed number of entries, then reports a
/// full disk for every later append.
pub struct FailingStorage {
    accepts_left: AtomicUsize,
    inner: MemoryStorage,
}

impl FailingStorage {
    pub fn after(accepted: usize) -> Arc<Self> {
        Arc::new(Self {
            accepts_left: AtomicUsize::new(accepted),
            inner: MemoryStorage::new(),
        })
    }

    /// Entries that made it into the ledger.
    pub fn stored(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl LedgerStorage for FailingStorage {
    async fn append(&self, entry: AuditEntry) -> Result<AuditEntry, AuditError> {
        let left = self.accepts_left.load(Ordering::SeqCst);
        if left == 0 {
            return Err(AuditError::LogFailed("No space left on device".into()));
        }
        self.accepts_left.store(left - 1, Ordering::SeqCst);
        self.inner.append(entry).await
    }

    async fn tail(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditError> {
        self.inner.tail(limit).await
    }
}
