use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, HttpRequest, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;

use crate::services::id_token_service::{TokenVerifier, VerifiedIdentity};
use crate::utils::AppError;

/// Verifies `Authorization: Bearer <id token>` and stores the resulting
/// [`VerifiedIdentity`] in the request extensions.
///
/// Without a verifier the guard lets every request through untouched and
/// handlers fall back to the uid sent in the body.
#[derive(Clone)]
pub struct IdentityGuard {
    verifier: Option<Arc<dyn TokenVerifier>>,
}

impl IdentityGuard {
    pub fn enabled(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            verifier: Some(verifier),
        }
    }

    pub fn disabled() -> Self {
        Self { verifier: None }
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = IdentityGuardService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityGuardService {
            service: Rc::new(service),
            verifier: self.verifier.clone(),
        }))
    }
}

pub struct IdentityGuardService<S> {
    service: Rc<S>,
    verifier: Option<Arc<dyn TokenVerifier>>,
}

fn unauthorized<B>(req: ServiceRequest, message: &str) -> ServiceResponse<EitherBody<B>> {
    let (request, _payload) = req.into_parts();
    let response = HttpResponse::Unauthorized()
        .json(serde_json::json!({ "message": message }))
        .map_into_right_body();
    ServiceResponse::new(request, response)
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

impl<S, B> Service<ServiceRequest> for IdentityGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let Some(verifier) = self.verifier.clone() else {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) });
        };

        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let token = match bearer_token(&req) {
                Some(token) => token,
                None => {
                    log::warn!("❌ {} {} - missing bearer token", req.method(), req.path());
                    return Ok(unauthorized(req, "Missing authorization token"));
                }
            };

            match verifier.verify(&token).await {
                Ok(identity) => {
                    log::debug!(
                        "🔐 Verified caller {} ({})",
                        identity.uid,
                        identity.email.as_deref().unwrap_or("no email")
                    );
                    req.extensions_mut().insert(identity);
                }
                Err(e) => {
                    log::warn!("❌ {} {} - {}", req.method(), req.path(), e);
                    return Ok(unauthorized(req, "Invalid token"));
                }
            }

            service.call(req).await.map(ServiceResponse::map_into_left_body)
        })
    }
}

/// Resolves the caller uid for a handler.
///
/// A verified identity wins over the uid claimed in the body; a claim that
/// disagrees with it is rejected. Without a verified identity the claim is
/// trusted as sent.
pub fn caller_uid(req: &HttpRequest, claimed: Option<&str>) -> Result<Option<String>, AppError> {
    match req.extensions().get::<VerifiedIdentity>() {
        Some(verified) => match claimed {
            Some(uid) if uid != verified.uid => {
                log::warn!("❌ Claimed uid {} does not match token subject {}", uid, verified.uid);
                Err(AppError::Forbidden("Unauthorized".to_string()))
            }
            _ => Ok(Some(verified.uid.clone())),
        },
        None => Ok(claimed.map(String::from)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::id_token_service::StaticTokenVerifier;
    use actix_web::{http::StatusCode, test, web, App};

    async fn whoami(req: HttpRequest) -> HttpResponse {
        match caller_uid(&req, None) {
            Ok(uid) => HttpResponse::Ok().json(serde_json::json!({ "uid": uid })),
            Err(_) => HttpResponse::Forbidden().finish(),
        }
    }

    #[actix_rt::test]
    async fn test_disabled_guard_passes_through() {
        let app = test::init_service(
            App::new()
                .wrap(IdentityGuard::disabled())
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let req = test::TestRequest::get().uri("/whoami").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["uid"].is_null());
    }

    #[actix_rt::test]
    async fn test_enabled_guard_requires_valid_token() {
        let app = test::init_service(
            App::new()
                .wrap(IdentityGuard::enabled(Arc::new(StaticTokenVerifier)))
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let req = test::TestRequest::get().uri("/whoami").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", "Bearer forged"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Invalid token");

        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", "Bearer test-token:abc"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["uid"], "abc");
    }

    #[actix_rt::test]
    async fn test_caller_uid_rejects_mismatched_claim() {
        let req = test::TestRequest::default().to_http_request();
        req.extensions_mut().insert(VerifiedIdentity {
            uid: "abc".into(),
            email: None,
        });

        assert_eq!(caller_uid(&req, Some("abc")).unwrap().as_deref(), Some("abc"));
        assert_eq!(caller_uid(&req, None).unwrap().as_deref(), Some("abc"));
        assert!(matches!(caller_uid(&req, Some("def")), Err(AppError::Forbidden(_))));
    }

    #[actix_rt::test]
    async fn test_caller_uid_trusts_claim_without_token() {
        let req = test::TestRequest::default().to_http_request();
        assert_eq!(caller_uid(&req, Some("abc")).unwrap().as_deref(), Some("abc"));
        assert_eq!(caller_uid(&req, None).unwrap(), None);
    }
}
