//! Snapshot export/import — the aggregate contract the backup subsystem
//! depends on.
//!
//! `export_snapshot` reads every collection at one point in time into a
//! [`SnapshotPayload`]; `import_snapshot` replaces every collection with the
//! payload's contents, wholesale, inside a single transaction.  No merging.

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::Result;
use crate::models::*;

/// Collection row names, one per entity type.
pub mod collections {
    pub const HEALTH_LOGS: &str = "health_logs";
    pub const SYMPTOMS: &str = "symptoms";
    pub const MEDICATIONS: &str = "medications";
    pub const MEDICATION_LOGS: &str = "medication_logs";
    pub const APPOINTMENTS: &str = "appointments";
    pub const DOCTOR_NOTES: &str = "doctor_notes";
    pub const FASTING_LOGS: &str = "fasting_logs";
    pub const VITALS: &str = "vitals";
    pub const DOCUMENTS: &str = "documents";
    pub const INSIGHTS: &str = "insights";
    pub const PROFILE: &str = "profile";
}

/// Full snapshot payload — serialized to JSON then encrypted client-side
/// before it ever leaves the device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotPayload {
    /// When the snapshot was exported.
    pub export_date: DateTime<Utc>,
    /// App version that produced the snapshot.
    pub app_version: String,
    pub health_logs: Vec<HealthLog>,
    pub symptoms: Vec<SymptomEntry>,
    pub medications: Vec<Medication>,
    pub medication_logs: Vec<MedicationLog>,
    pub appointments: Vec<Appointment>,
    pub doctor_notes: Vec<DoctorNote>,
    pub fasting_logs: Vec<FastingLog>,
    pub vitals: Vec<VitalsReading>,
    pub documents: Vec<DocumentMeta>,
    pub insights: Vec<Insight>,
    pub profile: Profile,
}

impl Database {
    /// Export every collection into a serializable snapshot.
    pub fn export_snapshot(&self) -> Result<SnapshotPayload> {
        Ok(SnapshotPayload {
            export_date: Utc::now(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            health_logs: self.get_collection(collections::HEALTH_LOGS)?,
            symptoms: self.get_collection(collections::SYMPTOMS)?,
            medications: self.get_collection(collections::MEDICATIONS)?,
            medication_logs: self.get_collection(collections::MEDICATION_LOGS)?,
            appointments: self.get_collection(collections::APPOINTMENTS)?,
            doctor_notes: self.get_collection(collections::DOCTOR_NOTES)?,
            fasting_logs: self.get_collection(collections::FASTING_LOGS)?,
            vitals: self.get_collection(collections::VITALS)?,
            documents: self.get_collection(collections::DOCUMENTS)?,
            insights: self.get_collection(collections::INSIGHTS)?,
            profile: self.get_profile()?,
        })
    }

    /// Import a snapshot, replacing every collection with the payload's
    /// contents.  Runs in one transaction: either all collections are
    /// replaced or none are.
    pub fn import_snapshot(&self, payload: &SnapshotPayload) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;

        tx.execute("DELETE FROM collections", [])?;

        let mut insert = |name: &str, json: String| -> Result<()> {
            tx.execute(
                "INSERT INTO collections (name, json) VALUES (?1, ?2)",
                rusqlite::params![name, json],
            )?;
            Ok(())
        };

        insert(collections::HEALTH_LOGS, serde_json::to_string(&payload.health_logs)?)?;
        insert(collections::SYMPTOMS, serde_json::to_string(&payload.symptoms)?)?;
        insert(collections::MEDICATIONS, serde_json::to_string(&payload.medications)?)?;
        insert(
            collections::MEDICATION_LOGS,
            serde_json::to_string(&payload.medication_logs)?,
        )?;
        insert(collections::APPOINTMENTS, serde_json::to_string(&payload.appointments)?)?;
        insert(collections::DOCTOR_NOTES, serde_json::to_string(&payload.doctor_notes)?)?;
        insert(collections::FASTING_LOGS, serde_json::to_string(&payload.fasting_logs)?)?;
        insert(collections::VITALS, serde_json::to_string(&payload.vitals)?)?;
        insert(collections::DOCUMENTS, serde_json::to_string(&payload.documents)?)?;
        insert(collections::INSIGHTS, serde_json::to_string(&payload.insights)?)?;
        insert(collections::PROFILE, serde_json::to_string(&payload.profile)?)?;

        tx.commit()?;

        tracing::info!(
            health_logs = payload.health_logs.len(),
            medications = payload.medications.len(),
            appointments = payload.appointments.len(),
            "snapshot imported"
        );

        Ok(())
    }

    /// Read the profile document. A missing row is the default profile.
    pub fn get_profile(&self) -> Result<Profile> {
        let json: Option<String> = self
            .conn()
            .query_row(
                "SELECT json FROM collections WHERE name = ?1",
                [collections::PROFILE],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Profile::default()),
        }
    }

    pub fn put_profile(&self, profile: &Profile) -> Result<()> {
        let json = serde_json::to_string(profile)?;
        self.conn().execute(
            "INSERT OR REPLACE INTO collections (name, json) VALUES (?1, ?2)",
            rusqlite::params![collections::PROFILE, json],
        )?;
        Ok(())
    }
}
