//! Domain model structs persisted in the local database.
//!
//! Every struct derives `Serialize` and `Deserialize` so whole collections
//! can be stored as JSON documents and shipped inside a backup snapshot.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Daily health logging
// ---------------------------------------------------------------------------

/// One daily health check-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthLog {
    /// Unique log identifier.
    pub id: Uuid,
    /// Calendar day the entry is for.
    pub date: NaiveDate,
    /// Self-reported mood, 1-5.
    pub mood: Option<u8>,
    /// Self-reported energy, 1-5.
    pub energy: Option<u8>,
    /// Self-reported pain, 0-10.
    pub pain: Option<u8>,
    /// Whether "sick mode" was active that day.
    pub sick_mode: bool,
    /// Free-text notes.
    pub notes: Option<String>,
    /// When the entry was recorded.
    pub created_at: DateTime<Utc>,
}

/// A symptom observation attached to a day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymptomEntry {
    pub id: Uuid,
    pub date: NaiveDate,
    /// Symptom name ("fatigue", "dizziness", ...).
    pub name: String,
    /// Severity, 1-5.
    pub severity: u8,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Medications
// ---------------------------------------------------------------------------

/// One scheduled dose within a day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoseSchedule {
    /// Time of day in "HH:MM" (24h) form.
    pub time: String,
    /// Amount per dose, in `Medication::unit`.
    pub amount: f64,
}

/// A medication the user takes, with its multi-dose daily schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medication {
    /// Unique medication identifier.
    pub id: Uuid,
    /// Display name ("Hydrocortisone").
    pub name: String,
    /// Dose unit ("mg", "ml", "tablet").
    pub unit: String,
    /// Scheduled doses across the day, in time order.
    pub doses: Vec<DoseSchedule>,
    /// Multiplier applied to every dose while sick mode is active
    /// (stress dosing for adrenal-insufficiency patients). `None` means the
    /// medication is not stress-dosed.
    pub stress_dose_multiplier: Option<f64>,
    /// Whether the medication is currently active.
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A recorded intake of one scheduled dose.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicationLog {
    pub id: Uuid,
    pub medication_id: Uuid,
    /// The schedule slot this intake satisfies ("HH:MM").
    pub scheduled_time: String,
    /// Amount actually taken (stress-dosed amounts differ from the schedule).
    pub amount_taken: f64,
    pub taken_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Appointments & notes
// ---------------------------------------------------------------------------

/// An upcoming or past medical appointment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub title: String,
    pub doctor_name: Option<String>,
    pub location: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A free-form note to bring up with (or received from) a doctor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorNote {
    pub id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Fasting, vitals, documents, insights
// ---------------------------------------------------------------------------

/// A fasting window (relevant to cortisol timing and lab prep).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FastingLog {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A single vitals reading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VitalsReading {
    pub id: Uuid,
    /// Measurement kind ("blood_pressure", "heart_rate", "weight", ...).
    pub kind: String,
    /// Primary value (systolic for blood pressure).
    pub value: f64,
    /// Secondary value (diastolic for blood pressure).
    pub value_secondary: Option<f64>,
    pub unit: String,
    pub measured_at: DateTime<Utc>,
}

/// Metadata for a medical document the user has attached (lab report,
/// referral letter).  The file itself lives outside the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentMeta {
    pub id: Uuid,
    pub file_name: String,
    /// Short summary produced by the document-analysis service, if any.
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A generated insight shown on the dashboard ("pain trends down on
/// stress-dose days").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Insight {
    pub id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// User profile and app settings. One instance per install.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub display_name: Option<String>,
    /// Primary condition ("adrenal insufficiency").
    pub condition: Option<String>,
    pub reminders_enabled: bool,
    pub theme: String,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            display_name: None,
            condition: None,
            reminders_enabled: true,
            theme: "light".into(),
        }
    }
}
