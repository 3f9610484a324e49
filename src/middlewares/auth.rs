use crate::authorization::AuthUser;
use crate::error::AppError;
use crate::services::AuthService;
use actix_web::http::Method;
use actix_web::{
    Error, HttpMessage, HttpRequest,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};
use std::rc::Rc;

/// Routes reachable without a token. A valid token is still resolved on them.
struct PublicPaths {
    exact_paths: Vec<&'static str>,
    prefix_paths: Vec<&'static str>,
    /// Public for GET only; writes need a token.
    read_prefix_paths: Vec<&'static str>,
    excluded_paths: Vec<&'static str>,
}

impl PublicPaths {
    fn new() -> Self {
        Self {
            exact_paths: vec![
                "/health",
                "/swagger-ui",
                "/swagger-ui/",
                "/api-docs/openapi.json",
            ],
            prefix_paths: vec!["/swagger-ui/", "/api-docs/", "/api/v1/auth/"],
            read_prefix_paths: vec![
                "/api/v1/products",
                "/api/v1/categories",
                "/api/v1/axs",
            ],
            excluded_paths: vec!["/api/v1/auth/logout", "/api/v1/auth/me"],
        }
    }

    fn is_public(&self, method: &Method, path: &str) -> bool {
        if self
            .excluded_paths
            .iter()
            .any(|&excluded| path.starts_with(excluded))
        {
            return false;
        }

        if self.exact_paths.contains(&path)
            || self.prefix_paths.iter().any(|&prefix| path.starts_with(prefix))
        {
            return true;
        }

        method == Method::GET
            && self
                .read_prefix_paths
                .iter()
                .any(|&prefix| path.starts_with(prefix))
    }
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

pub struct AuthMiddleware {
    auth_service: AuthService,
}

impl AuthMiddleware {
    pub fn new(auth_service: AuthService) -> Self {
        Self { auth_service }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            auth_service: self.auth_service.clone(),
            public_paths: Rc::new(PublicPaths::new()),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    auth_service: AuthService,
    public_paths: Rc<PublicPaths>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // CORS preflight
        if req.method() == Method::OPTIONS {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let public = self.public_paths.is_public(req.method(), req.path());
        let token = bearer_token(&req);
        let service = Rc::clone(&self.service);
        let auth_service = self.auth_service.clone();

        Box::pin(async move {
            match token {
                Some(token) => match auth_service.authenticate(&token).await {
                    Ok(auth_user) => {
                        req.extensions_mut().insert(auth_user);
                    }
                    Err(e) if public => {
                        log::debug!("Ignoring bad token on public path {}: {e}", req.path());
                    }
                    Err(e) => return Err(e.into()),
                },
                None if !public => {
                    return Err(AppError::AuthError("Missing access token".to_string()).into());
                }
                None => {}
            }

            service.call(req).await
        })
    }
}

/// The caller resolved by [`AuthMiddleware`], if any.
pub fn current_user(req: &HttpRequest) -> Option<AuthUser> {
    req.extensions().get::<AuthUser>().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_paths() {
        let paths = PublicPaths::new();

        assert!(paths.is_public(&Method::POST, "/api/v1/auth/login"));
        assert!(paths.is_public(&Method::POST, "/api/v1/auth/refresh"));
        assert!(!paths.is_public(&Method::GET, "/api/v1/auth/me"));
        assert!(!paths.is_public(&Method::POST, "/api/v1/auth/logout"));
        assert!(paths.is_public(&Method::GET, "/health"));
        assert!(paths.is_public(&Method::GET, "/swagger-ui/index.html"));

        assert!(paths.is_public(&Method::GET, "/api/v1/products/3"));
        assert!(!paths.is_public(&Method::POST, "/api/v1/products"));
        assert!(paths.is_public(&Method::GET, "/api/v1/categories/tree"));
        assert!(!paths.is_public(&Method::GET, "/api/v1/coupons"));
        assert!(!paths.is_public(&Method::GET, "/api/v1/users/1"));
    }
}
