pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod slots;

pub use models::{Appointment, AppointmentError, AppointmentStatus};
pub use services::flow::{BookingFlow, BookingStep};
