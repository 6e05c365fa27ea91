use crate::dials::models::DialRow;
use crate::upsert::BatchUpsert;

pub trait DialRepository: BatchUpsert<DialRow> {}
