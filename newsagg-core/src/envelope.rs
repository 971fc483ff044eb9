//! Response envelope and pagination wrapper.
//!
//! Every response body is wrapped in [`ApiResponse`]. Paged list endpoints
//! additionally nest a [`Page`] inside `data`. Page numbers are zero-indexed.

use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// Envelope wrapping every response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: T,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

impl<T> ApiResponse<T> {
    /// Consume the envelope and return the payload.
    pub fn into_data(self) -> T {
        self.data
    }

    /// Map the payload, keeping the envelope metadata.
    pub fn map<U, F>(self, f: F) -> ApiResponse<U>
    where
        F: FnOnce(T) -> U,
    {
        ApiResponse {
            success: self.success,
            message: self.message,
            data: f(self.data),
            timestamp: self.timestamp,
        }
    }
}

/// One page of a paged listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    pub total_pages: u32,
    /// Zero-indexed page number.
    pub number: u32,
    pub size: u32,
    pub first: bool,
    pub last: bool,
    pub empty: bool,
}

impl<T> Page<T> {
    /// Page number to request next, or `None` on the last page.
    pub fn next_page(&self) -> Option<u32> {
        if self.last {
            None
        } else {
            Some(self.number + 1)
        }
    }

    /// Page number to request previously, or `None` on the first page.
    pub fn previous_page(&self) -> Option<u32> {
        if self.first || self.number == 0 {
            None
        } else {
            Some(self.number - 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_decodes_with_server_timestamp() {
        let body = json!({
            "success": true,
            "message": "ok",
            "data": [1, 2, 3],
            "timestamp": "2024-05-01T08:30:00.123"
        });
        let decoded: ApiResponse<Vec<i32>> = serde_json::from_value(body).unwrap();
        assert!(decoded.success);
        assert_eq!(decoded.data, vec![1, 2, 3]);
        assert!(decoded.timestamp.is_some());
    }

    #[test]
    fn test_envelope_tolerates_missing_message_and_timestamp() {
        let decoded: ApiResponse<Option<i32>> =
            serde_json::from_value(json!({"success": true, "data": null})).unwrap();
        assert_eq!(decoded.message, "");
        assert_eq!(decoded.data, None);
        assert_eq!(decoded.timestamp, None);
    }

    #[test]
    fn test_page_navigation() {
        let page: Page<i32> = serde_json::from_value(json!({
            "content": [1],
            "totalElements": 21,
            "totalPages": 3,
            "number": 1,
            "size": 10,
            "first": false,
            "last": false,
            "empty": false
        }))
        .unwrap();
        assert_eq!(page.next_page(), Some(2));
        assert_eq!(page.previous_page(), Some(0));

        let last = Page::<i32> {
            number: 2,
            last: true,
            ..page
        };
        assert_eq!(last.next_page(), None);
    }
}
