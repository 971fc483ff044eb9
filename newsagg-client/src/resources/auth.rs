use newsagg_core::{ApiResponse, AuthResponse, LoginRequest, RegisterRequest, TransportResult};

use super::{call, encode};
use crate::transport::{ApiRequest, Transport};

pub struct AuthApi<'a> {
    transport: &'a dyn Transport,
}

impl<'a> AuthApi<'a> {
    pub(super) fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    pub async fn login(&self, request: &LoginRequest) -> TransportResult<ApiResponse<AuthResponse>> {
        let body = encode(request)?;
        call(self.transport, ApiRequest::post("/auth/login").with_body(body)).await
    }

    pub async fn register(
        &self,
        request: &RegisterRequest,
    ) -> TransportResult<ApiResponse<AuthResponse>> {
        let body = encode(request)?;
        call(self.transport, ApiRequest::post("/auth/register").with_body(body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::Recording;
    use crate::transport::HttpMethod;
    use serde_json::json;

    #[tokio::test]
    async fn test_login_posts_credentials() {
        let transport = Recording::replying(json!({
            "token": "t1",
            "userId": 7,
            "email": "admin@example.com",
            "fullName": "Admin",
            "role": "ADMIN"
        }));
        let api = AuthApi::new(&transport);

        let auth = api
            .login(&LoginRequest {
                email: "admin@example.com".to_string(),
                password: "rahasia".to_string(),
            })
            .await
            .unwrap()
            .into_data();
        assert_eq!(auth.token, "t1");
        assert_eq!(auth.user_id, 7);

        let request = transport.last();
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.path, "/auth/login");
        assert_eq!(
            request.body,
            Some(json!({"email": "admin@example.com", "password": "rahasia"}))
        );
    }

    #[tokio::test]
    async fn test_register_omits_unset_optionals() {
        let transport = Recording::replying(json!({
            "token": "t2",
            "userId": 8,
            "email": "baru@example.com",
            "fullName": "Pengguna Baru",
            "role": "USER"
        }));
        let api = AuthApi::new(&transport);

        api.register(&RegisterRequest {
            email: "baru@example.com".to_string(),
            password: "rahasia".to_string(),
            full_name: "Pengguna Baru".to_string(),
            categories: None,
            digest_enabled: None,
            digest_frequency: None,
        })
        .await
        .unwrap();

        let body = transport.last().body.unwrap();
        assert_eq!(body["fullName"], "Pengguna Baru");
        assert!(body.get("categories").is_none());
        assert_eq!(transport.last().path, "/auth/register");
    }
}
