use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::{Context, anyhow};
use chrono::Local; // timestamp in log lines
use clap::Parser;
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use leaa_backend::{
    config::Config,
    database::{ADMIN_ROLE, create_pool, run_migrations, seed_defaults},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    utils::JwtService,
};

#[derive(Debug, Parser)]
#[command(name = "leaa-backend", about = "Leaa back office API server")]
struct Cli {
    /// Path to the TOML config file; overrides CONFIG_PATH.
    #[arg(short, long)]
    config: Option<String>,

    /// Allow writes to the protected demo account for this run.
    #[arg(long)]
    nuke: bool,

    /// Give the `admin` role to an existing account, then exit.
    #[arg(long, value_name = "EMAIL")]
    grant_admin: Option<String>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config.as_deref() {
        Some(path) => Config::from_toml_path(path),
        None => Config::from_toml(),
    }
    .map_err(|e| anyhow!("Failed to load configuration: {e}"))?;

    if cli.nuke {
        log::warn!("--nuke given, demo account protection is off for this run");
        config.demo.allow_mutation = true;
    }

    let pool = create_pool(&config.database)
        .await
        .context("Failed to create database connection pool")?;

    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    seed_defaults(&pool)
        .await
        .context("Failed to seed roles and permissions")?;

    let jwt_service = JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expires_in,
        config.jwt.refresh_token_expires_in,
    );

    let auth_service = AuthService::new(pool.clone(), jwt_service);
    let user_service = UserService::new(pool.clone(), config.demo.clone());

    if let Some(email) = cli.grant_admin.as_deref() {
        let user = user_service
            .grant_role(email, ADMIN_ROLE)
            .await
            .with_context(|| format!("Failed to grant admin to {email}"))?;
        log::info!("User {} ({}) is now an admin", user.id, user.email);
        return Ok(());
    }

    let role_service = RoleService::new(pool.clone());
    let permission_service = PermissionService::new(pool.clone());
    let coupon_service = CouponService::new(pool.clone());
    let product_service = ProductService::new(pool.clone());
    let category_service = CategoryService::new(pool.clone());
    let attachment_service = AttachmentService::new(pool.clone());
    let ax_service = AxService::new(pool.clone());

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(auth_service.clone()))
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(role_service.clone()))
            .app_data(web::Data::new(permission_service.clone()))
            .app_data(web::Data::new(coupon_service.clone()))
            .app_data(web::Data::new(product_service.clone()))
            .app_data(web::Data::new(category_service.clone()))
            .app_data(web::Data::new(attachment_service.clone()))
            .app_data(web::Data::new(ax_service.clone()))
            .configure(swagger_config)
            .configure(handlers::health_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::auth_config)
                    .configure(handlers::user_config)
                    .configure(handlers::role_config)
                    .configure(handlers::permission_config)
                    .configure(handlers::coupon_config)
                    .configure(handlers::product_config)
                    .configure(handlers::category_config)
                    .configure(handlers::attachment_config)
                    .configure(handlers::ax_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;

    Ok(())
}
