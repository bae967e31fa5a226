//! Response helpers. Read routes answer with a bare JSON array of row objects; write
//! routes answer with a status code and an empty body.

use crate::rows::{serialize_rows, JsonRow, RowSet};
use axum::{http::StatusCode, Json};

pub fn rows(set: RowSet) -> (StatusCode, Json<Vec<JsonRow>>) {
    (StatusCode::OK, Json(serialize_rows(set)))
}

pub fn created() -> StatusCode {
    StatusCode::CREATED
}

pub fn ok() -> StatusCode {
    StatusCode::OK
}
