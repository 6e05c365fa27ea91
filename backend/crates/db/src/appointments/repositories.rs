use crate::appointments::models::AppointmentRow;
use crate::upsert::BatchUpsert;

pub trait AppointmentRepository: BatchUpsert<AppointmentRow> {}
