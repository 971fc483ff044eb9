use newsagg_core::{ApiResponse, PreferenceRequest, TransportResult, UserProfile};

use super::{call, encode};
use crate::transport::{ApiRequest, Transport};

/// Profile of the signed-in user.
pub struct UsersApi<'a> {
    transport: &'a dyn Transport,
}

impl<'a> UsersApi<'a> {
    pub(super) fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    pub async fn me(&self) -> TransportResult<ApiResponse<UserProfile>> {
        call(self.transport, ApiRequest::get("/users/me")).await
    }

    pub async fn update_preferences(
        &self,
        request: &PreferenceRequest,
    ) -> TransportResult<ApiResponse<UserProfile>> {
        let body = encode(request)?;
        call(self.transport, ApiRequest::put("/users/me/preferences").with_body(body)).await
    }
}
