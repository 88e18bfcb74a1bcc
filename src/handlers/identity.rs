use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};

use crate::domain::order::{Actor, Role};
use crate::errors::AppError;

/// Header carrying the authenticated user id, set by the auth layer in front
/// of this service after it has verified the bearer token.
pub const USER_ID_HEADER: &str = "X-User-Id";
/// Header carrying the authenticated user's role.
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// The caller's identity and role.
#[derive(Debug, Clone, Copy)]
pub struct Identity(pub Actor);

fn header<'a>(req: &'a HttpRequest, name: &str) -> Result<&'a str, AppError> {
    req.headers()
        .get(name)
        .ok_or_else(|| AppError::Unauthorized("no identity provided".to_string()))?
        .to_str()
        .map(str::trim)
        .map_err(|_| AppError::Unauthorized(format!("malformed {name} header")))
}

fn identify(req: &HttpRequest) -> Result<Identity, AppError> {
    let user_id = header(req, USER_ID_HEADER)?
        .parse::<i32>()
        .map_err(|_| AppError::Unauthorized(format!("malformed {USER_ID_HEADER} header")))?;
    let role = header(req, USER_ROLE_HEADER)?
        .parse::<Role>()
        .map_err(|_| AppError::Unauthorized(format!("malformed {USER_ROLE_HEADER} header")))?;
    Ok(Identity(Actor { user_id, role }))
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(identify(req))
    }
}

/// Client address for the audit trail.
pub fn source_address(req: &HttpRequest) -> Option<String> {
    req.connection_info()
        .realip_remote_addr()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn reads_identity_headers() {
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "7"))
            .insert_header((USER_ROLE_HEADER, "admin"))
            .to_http_request();
        let Identity(actor) = identify(&req).unwrap();
        assert_eq!(actor.user_id, 7);
        assert_eq!(actor.role, Role::Admin);
    }

    #[test]
    fn missing_or_malformed_identity_is_unauthorized() {
        let req = TestRequest::default().to_http_request();
        assert!(matches!(identify(&req), Err(AppError::Unauthorized(_))));

        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "seven"))
            .insert_header((USER_ROLE_HEADER, "admin"))
            .to_http_request();
        assert!(matches!(identify(&req), Err(AppError::Unauthorized(_))));

        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "7"))
            .insert_header((USER_ROLE_HEADER, "root"))
            .to_http_request();
        assert!(matches!(identify(&req), Err(AppError::Unauthorized(_))));
    }
}
