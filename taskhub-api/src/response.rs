/// Success envelopes
///
/// Every successful response is one of:
///
/// - `{ "success": true }`
/// - `{ "success": true, "data": ... }`
/// - `{ "success": true, "data": { "items": [...], "total": n } }`
/// - `{ "success": true, "errors": [...] }` — bulk operations where some
///   items were processed and the rest are reported individually

use axum::Json;
use serde::Serialize;

use crate::error::ErrorBody;

/// Bare success envelope
#[derive(Debug, Serialize)]
pub struct Success {
    pub success: bool,
}

/// Success envelope with a payload
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

/// Paginated payload
#[derive(Debug, Serialize)]
pub struct PageData<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Bulk-operation envelope: overall success plus per-item errors
#[derive(Debug, Serialize)]
pub struct BulkResponse {
    pub success: bool,
    pub errors: Vec<ErrorBody>,
}

pub fn ok() -> Json<Success> {
    Json(Success { success: true })
}

pub fn ok_with<T: Serialize>(data: T) -> Json<DataResponse<T>> {
    Json(DataResponse {
        success: true,
        data,
    })
}

pub fn ok_page<T: Serialize>(items: Vec<T>, total: i64) -> Json<DataResponse<PageData<T>>> {
    ok_with(PageData { items, total })
}

pub fn ok_bulk(errors: Vec<ErrorBody>) -> Json<BulkResponse> {
    Json(BulkResponse {
        success: true,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_envelope_shape() {
        let Json(response) = ok_with(vec![1, 2, 3]);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["data"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn test_page_envelope_shape() {
        let Json(response) = ok_page(vec!["a", "b"], 42);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["data"]["items"], serde_json::json!(["a", "b"]));
        assert_eq!(json["data"]["total"], 42);
    }

    #[test]
    fn test_bulk_envelope_is_success_with_errors() {
        let Json(response) = ok_bulk(vec![]);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["errors"], serde_json::json!([]));
    }
}
