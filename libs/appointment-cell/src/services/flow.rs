// libs/appointment-cell/src/services/flow.rs
//
// One booking state machine for both entry points: the standalone dialog
// (doctor already chosen) and the criteria-driven wizard. The dialog variant
// simply starts at the date step with its doctor preselected.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::models::{Doctor, DoctorSearchFilters};
use doctor_cell::services::directory::DirectoryService;
use shared_config::AppConfig;

use crate::models::{Appointment, AppointmentError};
use crate::services::ledger::AppointmentLedger;
use crate::slots;

/// Where the flow currently sits. Transitions only ever move one step
/// forward on success, or one step back via `back()` / conflict recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStep {
    Criteria,
    SelectDoctor,
    SelectDate,
    SelectTime,
    Confirm,
    Success,
}

pub struct BookingFlow {
    directory: DirectoryService,
    ledger: AppointmentLedger,
    step: BookingStep,
    /// Doctor the flow was opened with, if any. `reset()` restores it.
    initial_doctor: Option<Doctor>,
    candidates: Vec<Doctor>,
    doctor: Option<Doctor>,
    date: Option<NaiveDate>,
    occupied: HashSet<NaiveTime>,
    time: Option<NaiveTime>,
    notes: Option<String>,
    booked: Option<Appointment>,
}

impl BookingFlow {
    /// Criteria-driven wizard: the flow opens on the filter step.
    pub fn new(config: &AppConfig) -> Self {
        Self::build(config, None)
    }

    /// Standalone dialog: the doctor is already chosen, the flow opens on
    /// the date step.
    pub fn with_doctor(config: &AppConfig, doctor: Doctor) -> Self {
        Self::build(config, Some(doctor))
    }

    fn build(config: &AppConfig, initial_doctor: Option<Doctor>) -> Self {
        let step = if initial_doctor.is_some() {
            BookingStep::SelectDate
        } else {
            BookingStep::Criteria
        };
        Self {
            directory: DirectoryService::new(config),
            ledger: AppointmentLedger::new(config),
            step,
            doctor: initial_doctor.clone(),
            initial_doctor,
            candidates: Vec::new(),
            date: None,
            occupied: HashSet::new(),
            time: None,
            notes: None,
            booked: None,
        }
    }

    pub fn step(&self) -> BookingStep {
        self.step
    }

    pub fn candidates(&self) -> &[Doctor] {
        &self.candidates
    }

    pub fn selected_doctor(&self) -> Option<&Doctor> {
        self.doctor.as_ref()
    }

    pub fn occupied_slots(&self) -> &HashSet<NaiveTime> {
        &self.occupied
    }

    pub fn booked_appointment(&self) -> Option<&Appointment> {
        self.booked.as_ref()
    }

    /// Submit filter criteria and move to doctor selection. An empty result
    /// is a valid outcome the user sees, not an error.
    pub async fn apply_criteria(
        &mut self,
        filters: DoctorSearchFilters,
    ) -> Result<&[Doctor], AppointmentError> {
        self.expect_step(BookingStep::Criteria)?;

        let doctors = self
            .directory
            .search(filters, None, None)
            .await
            .map_err(|e| AppointmentError::DirectoryError(e.to_string()))?;

        debug!("Criteria matched {} doctors", doctors.len());
        self.candidates = doctors;
        self.step = BookingStep::SelectDoctor;
        Ok(&self.candidates)
    }

    /// Pick one doctor from the current candidates.
    pub fn select_doctor(&mut self, doctor_id: Uuid) -> Result<(), AppointmentError> {
        self.expect_step(BookingStep::SelectDoctor)?;

        let doctor = self
            .candidates
            .iter()
            .find(|d| d.id == doctor_id)
            .cloned()
            .ok_or_else(|| {
                AppointmentError::ValidationError(
                    "Selected doctor is not among the search results".to_string(),
                )
            })?;

        self.doctor = Some(doctor);
        self.step = BookingStep::SelectDate;
        Ok(())
    }

    /// Pick a date inside the booking horizon, then fetch which slots are
    /// already taken for that doctor and day.
    pub async fn select_date(
        &mut self,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<&HashSet<NaiveTime>, AppointmentError> {
        self.expect_step(BookingStep::SelectDate)?;
        slots::validate_booking_date(date, Utc::now().date_naive())?;

        let doctor_id = self.require_doctor()?.id;
        let occupied = self.ledger.occupied_slots(doctor_id, date, auth_token).await?;

        self.date = Some(date);
        self.occupied = occupied;
        self.step = BookingStep::SelectTime;
        Ok(&self.occupied)
    }

    /// Pick an available slot. Times outside the fixed slot list, or already
    /// occupied, are not selectable.
    pub fn select_time(&mut self, time: NaiveTime) -> Result<(), AppointmentError> {
        self.expect_step(BookingStep::SelectTime)?;

        if !slots::is_bookable_slot(time) {
            return Err(AppointmentError::InvalidTime(format!(
                "{} is not a bookable slot",
                time
            )));
        }
        if self.occupied.contains(&time) {
            return Err(AppointmentError::InvalidTime(format!(
                "{} is already booked",
                time
            )));
        }

        self.time = Some(time);
        self.step = BookingStep::Confirm;
        Ok(())
    }

    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes;
    }

    /// Attempt to persist the appointment. Exactly one of two concurrent
    /// confirms for the same slot succeeds; the loser sees `SlotTaken`, the
    /// flow refreshes the occupied set and rewinds to the time step so the
    /// user can pick again. Any other failure keeps the flow on the confirm
    /// step for a retry.
    pub async fn confirm(
        &mut self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<&Appointment, AppointmentError> {
        self.expect_step(BookingStep::Confirm)?;

        let doctor_id = self.require_doctor()?.id;
        let date = self
            .date
            .ok_or_else(|| AppointmentError::InvalidStep("No date selected".to_string()))?;
        let time = self
            .time
            .ok_or_else(|| AppointmentError::InvalidStep("No time selected".to_string()))?;

        match self
            .ledger
            .insert_appointment(patient_id, doctor_id, date, time, self.notes.clone(), auth_token)
            .await
        {
            Ok(appointment) => {
                info!(
                    "Booking flow completed: appointment {} for patient {}",
                    appointment.id, patient_id
                );
                self.booked = Some(appointment);
                self.step = BookingStep::Success;
                Ok(self.booked.as_ref().expect("just set"))
            }
            Err(AppointmentError::SlotTaken) => {
                warn!(
                    "Slot {} {} taken concurrently for doctor {}, rewinding to time selection",
                    date, time, doctor_id
                );
                self.occupied = self.ledger.occupied_slots(doctor_id, date, auth_token).await?;
                self.time = None;
                self.step = BookingStep::SelectTime;
                Err(AppointmentError::SlotTaken)
            }
            Err(other) => Err(other),
        }
    }

    /// Step back to the immediate predecessor, discarding everything chosen
    /// after that point. Returns false when there is nothing to go back to
    /// (initial and terminal states).
    pub fn back(&mut self) -> bool {
        match self.step {
            BookingStep::Criteria | BookingStep::Success => false,
            BookingStep::SelectDoctor => {
                self.candidates.clear();
                self.step = BookingStep::Criteria;
                true
            }
            BookingStep::SelectDate => {
                if self.initial_doctor.is_some() {
                    // Dialog variant opened here; no earlier step exists.
                    false
                } else {
                    self.doctor = None;
                    self.step = BookingStep::SelectDoctor;
                    true
                }
            }
            BookingStep::SelectTime => {
                self.date = None;
                self.occupied.clear();
                self.step = BookingStep::SelectDate;
                true
            }
            BookingStep::Confirm => {
                self.time = None;
                self.notes = None;
                self.step = BookingStep::SelectTime;
                true
            }
        }
    }

    /// Return the flow to its initial state, keeping only a preselected
    /// doctor if it was opened with one.
    pub fn reset(&mut self) {
        self.candidates.clear();
        self.doctor = self.initial_doctor.clone();
        self.date = None;
        self.occupied.clear();
        self.time = None;
        self.notes = None;
        self.booked = None;
        self.step = if self.initial_doctor.is_some() {
            BookingStep::SelectDate
        } else {
            BookingStep::Criteria
        };
    }

    fn expect_step(&self, expected: BookingStep) -> Result<(), AppointmentError> {
        if self.step != expected {
            return Err(AppointmentError::InvalidStep(format!(
                "Expected {:?}, flow is at {:?}",
                expected, self.step
            )));
        }
        Ok(())
    }

    fn require_doctor(&self) -> Result<&Doctor, AppointmentError> {
        self.doctor
            .as_ref()
            .ok_or_else(|| AppointmentError::InvalidStep("No doctor selected".to_string()))
    }
}
