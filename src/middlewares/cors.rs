use actix_cors::Cors;

pub fn create_cors() -> Cors {
    Cors::default()
        // The dashboard and www front-ends are served from other origins.
        .allowed_origin_fn(|_, _req_head| true)
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allow_any_header()
        .supports_credentials()
        .max_age(3600)
}
