//! The clinical scheduling actions.
//!
//! Schemas only; the backend supplies the handlers.

use clinic_core::{ActionHandler, ActionSpec, ParamSpec, ParamType};
use std::sync::Arc;

use crate::error::RegistryError;
use crate::registry::ActionRegistry;

/// Backend handlers for the four clinical actions.
#[derive(Clone)]
pub struct ClinicalHandlers {
    pub search_patient: Arc<dyn ActionHandler>,
    pub check_insurance_eligibility: Arc<dyn ActionHandler>,
    pub find_available_slots: Arc<dyn ActionHandler>,
    pub book_appointment: Arc<dyn ActionHandler>,
}

/// Action specs in their canonical order.
pub fn clinical_actions(handlers: ClinicalHandlers) -> Vec<ActionSpec> {
    vec![
        ActionSpec::builder("search_patient", handlers.search_patient)
            .description("Search for a patient by name or ID in the hospital system")
            .param(ParamSpec::required(
                "query",
                ParamType::String,
                "Patient name or ID to search for",
            ))
            .idempotent(true)
            .build(),
        ActionSpec::builder(
            "check_insurance_eligibility",
            handlers.check_insurance_eligibility,
        )
        .description("Check if a patient's insurance is eligible for a specific service")
        .param(ParamSpec::required(
            "patient_id",
            ParamType::String,
            "Unique patient identifier",
        ))
        .param(ParamSpec::required(
            "service_type",
            ParamType::String,
            "Type of medical service (e.g., 'cardiology', 'general')",
        ))
        .idempotent(true)
        .build(),
        ActionSpec::builder("find_available_slots", handlers.find_available_slots)
            .description("Find available appointment slots for a specific specialty")
            .param(ParamSpec::required(
                "specialty",
                ParamType::String,
                "Medical specialty (e.g., 'cardiology', 'orthopedics')",
            ))
            .param(ParamSpec::required(
                "date_range_start",
                ParamType::String,
                "Start date in YYYY-MM-DD format",
            ))
            .param(ParamSpec::optional(
                "date_range_end",
                ParamType::String,
                "End date in YYYY-MM-DD format",
            ))
            .idempotent(true)
            .build(),
        // Booking twice is not the same as booking once.
        ActionSpec::builder("book_appointment", handlers.book_appointment)
            .description("Book an appointment for a patient in a specific slot")
            .param(ParamSpec::required(
                "patient_id",
                ParamType::String,
                "Unique patient identifier",
            ))
            .param(ParamSpec::required(
                "slot_id",
                ParamType::String,
                "ID of the available appointment slot",
            ))
            .idempotent(false)
            .build(),
    ]
}

/// A registry holding the four clinical actions.
pub fn clinical_registry(handlers: ClinicalHandlers) -> Result<ActionRegistry, RegistryError> {
    ActionRegistry::from_specs(clinical_actions(handlers))
}
