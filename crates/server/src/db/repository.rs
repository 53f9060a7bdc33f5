use futures::TryStreamExt;
use mediquest_core::records::{
    ADMIN_LOGIN, CONNECTIONS, DOCTOR_LOGIN, PATIENT_LOGIN, PATIENT_RECORDS,
};
use mediquest_core::{AdminLogin, Connection, DoctorLogin, PatientLogin, PatientRecord, Role};
use mongodb::{
    Collection, Database,
    bson::{Bson, Document, doc},
    error::Result,
};
use serde_json::Value as JsonValue;

/// Result of an insert guarded by an existence check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

/// Repository for logins, patient records and patient/doctor connections
#[derive(Clone)]
pub struct EhrRepository {
    db: Database,
}

impl EhrRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn admins(&self) -> Collection<AdminLogin> {
        self.db.collection(ADMIN_LOGIN)
    }

    fn doctors(&self) -> Collection<DoctorLogin> {
        self.db.collection(DOCTOR_LOGIN)
    }

    fn patients(&self) -> Collection<PatientLogin> {
        self.db.collection(PATIENT_LOGIN)
    }

    fn records(&self) -> Collection<PatientRecord> {
        self.db.collection(PATIENT_RECORDS)
    }

    fn connections(&self) -> Collection<Connection> {
        self.db.collection(CONNECTIONS)
    }

    /// Check credentials against the role's login collection
    pub async fn verify_login(&self, role: Role, user_id: &str, password: &str) -> Result<bool> {
        let mut filter = Document::new();
        filter.insert(role.id_field(), user_id);
        filter.insert("password", password);

        let found = self
            .db
            .collection::<Document>(role.login_collection())
            .find_one(filter)
            .await?;
        Ok(found.is_some())
    }

    /// Patients connected to a doctor, each with its record when one exists
    pub async fn connected_patients(
        &self,
        doctor_id: &str,
    ) -> Result<Vec<(String, Option<PatientRecord>)>> {
        let connections: Vec<Connection> = self
            .connections()
            .find(doc! { "doctor_id": doctor_id })
            .await?
            .try_collect()
            .await?;

        let mut patients = Vec::with_capacity(connections.len());
        for connection in connections {
            let record = self.patient_record(&connection.patient_id).await?;
            patients.push((connection.patient_id, record));
        }
        Ok(patients)
    }

    /// Ids of every patient connected to the doctor
    pub async fn connected_patient_ids(&self, doctor_id: &str) -> Result<Vec<String>> {
        let connections: Vec<Connection> = self
            .connections()
            .find(doc! { "doctor_id": doctor_id })
            .await?
            .try_collect()
            .await?;
        Ok(connections.into_iter().map(|c| c.patient_id).collect())
    }

    pub async fn is_connected(&self, doctor_id: &str, patient_id: &str) -> Result<bool> {
        let found = self
            .connections()
            .find_one(doc! { "doctor_id": doctor_id, "patient_id": patient_id })
            .await?;
        Ok(found.is_some())
    }

    pub async fn patient_record(&self, patient_id: &str) -> Result<Option<PatientRecord>> {
        self.records()
            .find_one(doc! { "patient_id": patient_id })
            .await
    }

    /// Register a patient and connect them to the doctor adding them
    pub async fn add_patient(
        &self,
        login: PatientLogin,
        record: PatientRecord,
        doctor_id: &str,
    ) -> Result<InsertOutcome> {
        let existing = self
            .patients()
            .find_one(doc! { "patient_id": login.patient_id.as_str() })
            .await?;
        if existing.is_some() {
            return Ok(InsertOutcome::AlreadyExists);
        }

        let connection = Connection::new(&login.patient_id, doctor_id);
        self.patients().insert_one(&login).await?;
        self.records().insert_one(&record).await?;
        self.connections().insert_one(&connection).await?;
        Ok(InsertOutcome::Inserted)
    }

    pub async fn add_doctor(&self, login: DoctorLogin) -> Result<InsertOutcome> {
        let existing = self
            .doctors()
            .find_one(doc! { "doctor_id": login.doctor_id.as_str() })
            .await?;
        if existing.is_some() {
            return Ok(InsertOutcome::AlreadyExists);
        }
        self.doctors().insert_one(&login).await?;
        Ok(InsertOutcome::Inserted)
    }

    pub async fn add_admin(&self, login: AdminLogin) -> Result<InsertOutcome> {
        let existing = self
            .admins()
            .find_one(doc! { "username": login.username.as_str() })
            .await?;
        if existing.is_some() {
            return Ok(InsertOutcome::AlreadyExists);
        }
        self.admins().insert_one(&login).await?;
        Ok(InsertOutcome::Inserted)
    }

    /// Every stored patient record as relaxed extended JSON, untyped
    pub async fn all_patient_documents(&self) -> Result<Vec<JsonValue>> {
        let documents: Vec<Document> = self
            .db
            .collection::<Document>(PATIENT_RECORDS)
            .find(doc! {})
            .await?
            .try_collect()
            .await?;
        Ok(documents
            .into_iter()
            .map(|d| Bson::Document(d).into_relaxed_extjson())
            .collect())
    }
}
