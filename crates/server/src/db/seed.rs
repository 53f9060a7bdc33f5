//! Synthetic EHR data for demos

use fake::Fake;
use fake::faker::address::en::{BuildingNumber, CityName, StateAbbr, StreetName, ZipCode};
use fake::faker::internet::en::Password;
use fake::faker::name::en::Name;
use fake::faker::phone_number::en::PhoneNumber;
use mediquest_core::records::{CONNECTIONS, DOCTOR_LOGIN, PATIENT_LOGIN, PATIENT_RECORDS};
use mediquest_core::{Connection, DoctorLogin, Gender, PatientLogin, PatientRecord};
use mongodb::{Database, bson::doc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const GENDERS: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

/// How much data to generate
#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub patients: usize,
    pub doctors: usize,
    /// Fixed RNG seed for reproducible data
    pub seed: Option<u64>,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            patients: 50,
            doctors: 10,
            seed: None,
        }
    }
}

/// Generated documents, ready to insert
#[derive(Debug, Clone, Default)]
pub struct SyntheticEhr {
    pub doctors: Vec<DoctorLogin>,
    pub patient_logins: Vec<PatientLogin>,
    pub records: Vec<PatientRecord>,
    pub connections: Vec<Connection>,
}

/// Generate doctors `DOC1000..` and patients `PAT1000..`, each patient
/// connected to one random doctor.
pub fn generate(options: &SeedOptions) -> SyntheticEhr {
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let doctors: Vec<DoctorLogin> = (0..options.doctors)
        .map(|i| DoctorLogin {
            doctor_id: format!("DOC{}", 1000 + i),
            password: Password(8..16).fake_with_rng(&mut rng),
        })
        .collect();

    let mut ehr = SyntheticEhr {
        doctors,
        ..Default::default()
    };

    for i in 0..options.patients {
        let patient_id = format!("PAT{}", 1000 + i);
        ehr.patient_logins.push(PatientLogin {
            patient_id: patient_id.clone(),
            password: Password(8..16).fake_with_rng(&mut rng),
        });

        let address = format!(
            "{} {}, {}, {} {}",
            BuildingNumber().fake_with_rng::<String, _>(&mut rng),
            StreetName().fake_with_rng::<String, _>(&mut rng),
            CityName().fake_with_rng::<String, _>(&mut rng),
            StateAbbr().fake_with_rng::<String, _>(&mut rng),
            ZipCode().fake_with_rng::<String, _>(&mut rng),
        );

        ehr.records.push(PatientRecord {
            patient_id: patient_id.clone(),
            name: Name().fake_with_rng(&mut rng),
            age: rng.gen_range(18..=90),
            gender: GENDERS[rng.gen_range(0..GENDERS.len())],
            address,
            contact: PhoneNumber().fake_with_rng(&mut rng),
            diabetes: rng.gen_bool(0.5).into(),
            blood_pressure: rng.gen_bool(0.5).into(),
            arthritis: rng.gen_bool(0.5).into(),
            asthma: rng.gen_bool(0.5).into(),
            thyroid: rng.gen_bool(0.5).into(),
        });

        if let Some(doctor) = ehr.doctors.choose(&mut rng) {
            ehr.connections.push(Connection::new(&patient_id, &doctor.doctor_id));
        }
    }

    ehr
}

/// Replace the demo collections with `ehr`
pub async fn populate(db: &Database, ehr: &SyntheticEhr) -> Result<(), mongodb::error::Error> {
    let doctors = db.collection::<DoctorLogin>(DOCTOR_LOGIN);
    let patient_logins = db.collection::<PatientLogin>(PATIENT_LOGIN);
    let records = db.collection::<PatientRecord>(PATIENT_RECORDS);
    let connections = db.collection::<Connection>(CONNECTIONS);

    doctors.delete_many(doc! {}).await?;
    patient_logins.delete_many(doc! {}).await?;
    records.delete_many(doc! {}).await?;
    connections.delete_many(doc! {}).await?;

    if !ehr.doctors.is_empty() {
        doctors.insert_many(&ehr.doctors).await?;
    }
    if !ehr.patient_logins.is_empty() {
        patient_logins.insert_many(&ehr.patient_logins).await?;
        records.insert_many(&ehr.records).await?;
    }
    if !ehr.connections.is_empty() {
        connections.insert_many(&ehr.connections).await?;
    }

    tracing::info!(
        doctors = ehr.doctors.len(),
        patients = ehr.records.len(),
        "Synthetic EHR database populated"
    );
    Ok(())
}
