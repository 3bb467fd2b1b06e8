//! Success envelopes. Every body is `{ "data": ... }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// `200 OK` with `value` wrapped in the envelope.
pub fn data<T: Serialize>(value: T) -> Json<DataResponse<T>> {
    Json(DataResponse { data: value })
}

/// `201 Created` with the new resource in the envelope.
#[derive(Debug)]
pub struct Created<T>(pub T);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, data(self.0)).into_response()
    }
}
