//! EHR documents as stored in MongoDB
//!
//! These are flat key-value documents. Nothing enforces that a connection
//! points at an existing patient or doctor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RecordError;

pub const ADMIN_LOGIN: &str = "admin_login";
pub const DOCTOR_LOGIN: &str = "doctor_login";
pub const PATIENT_LOGIN: &str = "patient_login";
pub const PATIENT_RECORDS: &str = "patient_records";
pub const CONNECTIONS: &str = "patient_doctor_connections";

/// Collections holding credentials; never reachable through queries
pub const LOGIN_COLLECTIONS: [&str; 3] = [ADMIN_LOGIN, DOCTOR_LOGIN, PATIENT_LOGIN];

pub fn is_login_collection(name: &str) -> bool {
    LOGIN_COLLECTIONS.contains(&name.trim())
}

/// Conditions tracked as yes/no flags on every patient record
pub const DISEASES: [&str; 5] = ["diabetes", "blood_pressure", "arthritis", "asthma", "thyroid"];

/// Who is logged in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Doctor,
    Patient,
}

impl Role {
    /// Capitalized name used in user-facing messages
    pub fn title(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Doctor => "Doctor",
            Role::Patient => "Patient",
        }
    }

    /// Login collection for this role
    pub fn login_collection(&self) -> &'static str {
        match self {
            Role::Admin => ADMIN_LOGIN,
            Role::Doctor => DOCTOR_LOGIN,
            Role::Patient => PATIENT_LOGIN,
        }
    }

    /// Field holding the user identifier in the login collection
    pub fn id_field(&self) -> &'static str {
        match self {
            Role::Admin => "username",
            Role::Doctor => "doctor_id",
            Role::Patient => "patient_id",
        }
    }
}

impl FromStr for Role {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "doctor" => Ok(Role::Doctor),
            "patient" => Ok(Role::Patient),
            other => Err(RecordError::InvalidRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminLogin {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DoctorLogin {
    pub doctor_id: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientLogin {
    pub patient_id: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Yes/no disease flag
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Flag {
    Yes,
    No,
}

impl From<bool> for Flag {
    fn from(value: bool) -> Self {
        if value { Flag::Yes } else { Flag::No }
    }
}

/// General patient information plus disease flags
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientRecord {
    pub patient_id: String,
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub address: String,
    pub contact: String,
    pub diabetes: Flag,
    pub blood_pressure: Flag,
    pub arthritis: Flag,
    pub asthma: Flag,
    pub thyroid: Flag,
}

/// Patient assigned to a doctor, with the chat room they share
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Connection {
    pub patient_id: String,
    pub doctor_id: String,
    pub room_id: String,
}

impl Connection {
    pub fn new(patient_id: &str, doctor_id: &str) -> Self {
        Self {
            patient_id: patient_id.to_string(),
            doctor_id: doctor_id.to_string(),
            room_id: format!("room_{patient_id}_{doctor_id}"),
        }
    }
}

/// Form submitted by a doctor to register a patient
#[derive(Debug, Clone, Deserialize)]
pub struct NewPatient {
    pub patient_id: String,
    pub password: String,
    pub name: String,
    pub age: i64,
    pub gender: Gender,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub contact: String,
    pub diabetes: Flag,
    pub blood_pressure: Flag,
    pub arthritis: Flag,
    pub asthma: Flag,
    pub thyroid: Flag,
}

impl NewPatient {
    /// Validate the form and split it into the login and record documents
    pub fn into_documents(self) -> Result<(PatientLogin, PatientRecord), RecordError> {
        let patient_id = self.patient_id.trim().to_string();
        if patient_id.is_empty() {
            return Err(RecordError::MissingField("patient_id"));
        }
        if self.password.is_empty() {
            return Err(RecordError::MissingField("password"));
        }
        if !(0..=120).contains(&self.age) {
            return Err(RecordError::AgeOutOfRange(self.age));
        }

        let login = PatientLogin {
            patient_id: patient_id.clone(),
            password: self.password,
        };
        let record = PatientRecord {
            patient_id,
            name: self.name,
            age: self.age as u32,
            gender: self.gender,
            address: self.address,
            contact: self.contact,
            diabetes: self.diabetes,
            blood_pressure: self.blood_pressure,
            arthritis: self.arthritis,
            asthma: self.asthma,
            thyroid: self.thyroid,
        };
        Ok((login, record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_login_collections() {
        assert!(is_login_collection("doctor_login"));
        assert!(is_login_collection(" admin_login "));
        assert!(!is_login_collection(PATIENT_RECORDS));
    }

    fn new_patient(age: i64) -> NewPatient {
        serde_json::from_value(json!({
            "patient_id": " PAT2000 ",
            "password": "secret",
            "name": "Ada Lovelace",
            "age": age,
            "gender": "Female",
            "diabetes": "no",
            "blood_pressure": "yes",
            "arthritis": "no",
            "asthma": "no",
            "thyroid": "yes"
        }))
        .unwrap()
    }

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!("Doctor".parse::<Role>().unwrap(), Role::Doctor);
        assert_eq!(" admin ".parse::<Role>().unwrap(), Role::Admin);
        assert!("nurse".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_login_fields() {
        assert_eq!(Role::Admin.id_field(), "username");
        assert_eq!(Role::Doctor.login_collection(), "doctor_login");
        assert_eq!(Role::Patient.id_field(), "patient_id");
    }

    #[test]
    fn test_connection_room_id() {
        let conn = Connection::new("PAT1000", "DOC1003");
        assert_eq!(conn.room_id, "room_PAT1000_DOC1003");
    }

    #[test]
    fn test_new_patient_split() {
        let (login, record) = new_patient(42).into_documents().unwrap();
        assert_eq!(login.patient_id, "PAT2000");
        assert_eq!(record.patient_id, "PAT2000");
        assert_eq!(record.age, 42);
        assert_eq!(record.blood_pressure, Flag::Yes);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["gender"], "Female");
        assert_eq!(json["thyroid"], "yes");
        assert_eq!(json["address"], "");
    }

    #[test]
    fn test_new_patient_rejects_bad_age() {
        assert!(matches!(
            new_patient(121).into_documents(),
            Err(RecordError::AgeOutOfRange(121))
        ));
        assert!(new_patient(-1).into_documents().is_err());
        assert!(new_patient(0).into_documents().is_ok());
    }

    #[test]
    fn test_new_patient_requires_id() {
        let mut patient = new_patient(30);
        patient.patient_id = "   ".to_string();
        assert!(matches!(
            patient.into_documents(),
            Err(RecordError::MissingField("patient_id"))
        ));
    }
}
