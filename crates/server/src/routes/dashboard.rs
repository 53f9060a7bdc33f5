//! Doctor and admin dashboards

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use mediquest_core::{DoctorLogin, NewPatient, Outcome, PatientRecord, Role};
use serde::{Deserialize, Serialize};

use crate::db::InsertOutcome;
use crate::error::AppError;
use crate::session::Session;
use crate::state::AppState;

/// A connected patient; `record` is null when no record exists for the id
#[derive(Serialize)]
pub struct ConnectedPatient {
    patient_id: String,
    record: Option<PatientRecord>,
}

#[derive(Serialize)]
pub struct DoctorDashboard {
    doctor_id: String,
    patients: Vec<ConnectedPatient>,
}

#[derive(Deserialize)]
pub struct NewDoctor {
    doctor_id: String,
    password: String,
}

/// GET /doctor/patients - Patients connected to the logged-in doctor
pub async fn doctor_patients(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, AppError> {
    session.require(&[Role::Doctor])?;

    let patients = state
        .repository()
        .connected_patients(&session.username)
        .await?
        .into_iter()
        .map(|(patient_id, record)| {
            if record.is_none() {
                tracing::warn!(patient_id = %patient_id, "Connected patient has no record");
            }
            ConnectedPatient { patient_id, record }
        })
        .collect();

    Ok(Json(DoctorDashboard {
        doctor_id: session.username,
        patients,
    }))
}

/// POST /doctor/patients - Register a patient under the logged-in doctor
pub async fn add_patient(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<NewPatient>,
) -> Result<impl IntoResponse, AppError> {
    session.require(&[Role::Doctor])?;

    let (login, record) = body.into_documents()?;
    let patient_id = login.patient_id.clone();

    match state
        .repository()
        .add_patient(login, record, &session.username)
        .await?
    {
        InsertOutcome::Inserted => Ok((
            StatusCode::CREATED,
            Json(Outcome::success(&format!(
                "Patient `{patient_id}` added successfully."
            ))),
        )),
        InsertOutcome::AlreadyExists => {
            Err(AppError::Conflict("Patient ID already exists.".to_string()))
        }
    }
}

/// GET /patients/{patient_id} - One record; doctors see connected patients, patients themselves
pub async fn patient(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(patient_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let repo = state.repository();

    match session.role {
        Role::Admin => {}
        Role::Doctor => {
            if !repo.is_connected(&session.username, &patient_id).await? {
                return Err(AppError::Forbidden(format!(
                    "Patient `{patient_id}` is not connected to you."
                )));
            }
        }
        Role::Patient => {
            if session.username != patient_id {
                return Err(AppError::Forbidden(
                    "Patients can only view their own record.".to_string(),
                ));
            }
        }
    }

    repo.patient_record(&patient_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No data found for patient `{patient_id}`")))
}

/// POST /admin/doctors - Register a doctor account
pub async fn add_doctor(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<NewDoctor>,
) -> Result<impl IntoResponse, AppError> {
    session.require(&[Role::Admin])?;

    let doctor_id = body.doctor_id.trim().to_string();
    if doctor_id.is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest("All fields are required.".to_string()));
    }

    let login = DoctorLogin {
        doctor_id: doctor_id.clone(),
        password: body.password,
    };
    match state.repository().add_doctor(login).await? {
        InsertOutcome::Inserted => Ok((
            StatusCode::CREATED,
            Json(Outcome::success(&format!(
                "Doctor `{doctor_id}` added successfully."
            ))),
        )),
        InsertOutcome::AlreadyExists => {
            Err(AppError::Conflict("Doctor ID already exists.".to_string()))
        }
    }
}
