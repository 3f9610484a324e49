use crate::authorization::{AuthUser, Permission};
use crate::entities::user_entity as users;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::role_service::{permissions_of_roles, roles_of_user};
use crate::utils::*;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

const LOGIN_FAILED: &str = "User or password error";
const TOKEN_ERROR: &str = "Token Error";

#[derive(Clone)]
pub struct AuthService {
    pool: DatabaseConnection,
    jwt_service: JwtService,
}

impl AuthService {
    pub fn new(pool: DatabaseConnection, jwt_service: JwtService) -> Self {
        Self { pool, jwt_service }
    }

    /// `account` is either an email address or a phone number.
    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        let account = request.account.trim();
        let condition = if is_email(account) {
            Condition::all().add(users::Column::Email.eq(account.to_lowercase()))
        } else {
            Condition::all().add(users::Column::Phone.eq(account))
        };

        let user = users::Entity::find()
            .filter(condition)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::AuthError(LOGIN_FAILED.to_string()))?;

        // Disabled accounts get the same answer as a wrong password.
        if !user.is_enabled() || !verify_password(&request.password, &user.password)? {
            log::warn!("Failed login for account {account}");
            return Err(AppError::AuthError(LOGIN_FAILED.to_string()));
        }

        log::info!("User {} logged in", user.id);
        self.issue_tokens(user)
    }

    pub async fn signup(&self, request: SignupRequest) -> AppResult<AuthResponse> {
        let email = request.email.trim().to_lowercase();
        validate_email(&email)?;
        validate_password(&request.password)?;

        let existing = users::Entity::find()
            .filter(users::Column::Email.eq(&email))
            .one(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::ValidationError(
                "Email already registered".to_string(),
            ));
        }

        let user = users::ActiveModel {
            email: Set(email),
            name: Set(normalize_optional(request.name)),
            password: Set(hash_password(&request.password)?),
            is_admin: Set(false),
            status: Set(1),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.pool)
        .await
        // a concurrent signup can pass the lookup above
        .map_err(|e| AppError::on_unique_violation(e, "Email already registered"))?;

        log::info!("User {} signed up", user.id);
        self.issue_tokens(user)
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthResponse> {
        let claims = self.jwt_service.verify_refresh_token(refresh_token)?;
        let user = self.active_user(&claims).await?;

        let access_token = self.jwt_service.generate_access_token(user.id)?;

        Ok(AuthResponse {
            user: UserResponse::from(user),
            access_token,
            refresh_token: refresh_token.to_string(),
            expires_in: self.jwt_service.get_access_token_expires_in(),
        })
    }

    /// Resolve a bearer access token into the caller and everything its roles grant.
    pub async fn authenticate(&self, token: &str) -> AppResult<AuthUser> {
        let claims = self.jwt_service.verify_access_token(token)?;
        let user = self.active_user(&claims).await?;

        self.load_auth_user(user).await
    }

    pub async fn user_by_token(&self, token: &str) -> AppResult<UserResponse> {
        let auth_user = self.authenticate(token).await?;
        Ok(auth_user.user.into())
    }

    pub async fn load_auth_user(&self, user: users::Model) -> AppResult<AuthUser> {
        let roles = roles_of_user(&self.pool, user.id).await?;
        let role_ids: Vec<i32> = roles.iter().map(|r| r.id).collect();

        let permissions = permissions_of_roles(&self.pool, &role_ids)
            .await?
            .into_iter()
            .filter_map(|p| match p.slug.parse::<Permission>() {
                Ok(permission) => Some(permission),
                Err(e) => {
                    log::debug!("Ignoring {e}");
                    None
                }
            });

        Ok(AuthUser::new(
            user,
            roles.into_iter().map(|r| r.slug).collect(),
            permissions,
        ))
    }

    pub fn current_user(&self, auth_user: &AuthUser) -> CurrentUserResponse {
        CurrentUserResponse {
            user: auth_user.user.clone().into(),
            roles: auth_user.role_slugs.clone(),
            permissions: auth_user
                .permissions
                .iter()
                .map(|p| p.slug().to_string())
                .collect(),
        }
    }

    /// The token's user, provided it is still enabled and the token postdates `last_token_at`.
    ///
    /// A token stamped in the same millisecond as `last_token_at` counts as revoked.
    async fn active_user(&self, claims: &Claims) -> AppResult<users::Model> {
        let user = users::Entity::find_by_id(claims.user_id()?)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::AuthError(TOKEN_ERROR.to_string()))?;

        if !user.is_enabled() {
            return Err(AppError::AuthError("User is disabled".to_string()));
        }

        if let Some(last_token_at) = user.last_token_at
            && claims.issued_at_millis() <= last_token_at.timestamp_millis()
        {
            log::info!("Rejected token of user {} issued before {}", user.id, last_token_at);
            return Err(AppError::AuthError("Token has been revoked".to_string()));
        }

        Ok(user)
    }

    fn issue_tokens(&self, user: users::Model) -> AppResult<AuthResponse> {
        let access_token = self.jwt_service.generate_access_token(user.id)?;
        let refresh_token = self.jwt_service.generate_refresh_token(user.id)?;

        Ok(AuthResponse {
            user: UserResponse::from(user),
            access_token,
            refresh_token,
            expires_in: self.jwt_service.get_access_token_expires_in(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DemoConfig;
    use crate::services::UserService;
    use crate::test_support::{
        TEST_PASSWORD, assign_role, auth_user, insert_role, insert_user, setup_db,
    };
    use chrono::Duration;
    use sea_orm::IntoActiveModel;

    fn jwt() -> JwtService {
        JwtService::new("test-secret", 3600, 86400)
    }

    fn login(account: &str, password: &str) -> LoginRequest {
        LoginRequest {
            account: account.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_and_authenticate() {
        let db = setup_db().await;
        let user = insert_user(&db, "staff@leaa.com").await;
        let role = insert_role(&db, "staff", &[Permission::CouponListRead]).await;
        assign_role(&db, user.id, role.id).await;
        let service = AuthService::new(db.clone(), jwt());

        let response = service
            .login(login("staff@leaa.com", TEST_PASSWORD))
            .await
            .unwrap();
        assert_eq!(response.user.id, user.id);

        let auth_user = service.authenticate(&response.access_token).await.unwrap();
        assert_eq!(auth_user.id(), user.id);
        assert_eq!(auth_user.role_slugs, vec!["staff"]);
        assert!(auth_user.permissions.contains(&Permission::CouponListRead));

        let me = service.current_user(&auth_user);
        assert_eq!(me.permissions, vec!["coupon.list-read"]);
    }

    #[tokio::test]
    async fn test_login_failures_share_one_message() {
        let db = setup_db().await;
        let disabled = insert_user(&db, "off@leaa.com").await;
        insert_user(&db, "on@leaa.com").await;
        let mut am = disabled.into_active_model();
        am.status = Set(0);
        am.update(&db).await.unwrap();
        let service = AuthService::new(db.clone(), jwt());

        for (account, password) in [
            ("on@leaa.com", "WrongPassword1"),
            ("off@leaa.com", TEST_PASSWORD),
            ("ghost@leaa.com", TEST_PASSWORD),
        ] {
            let result = service.login(login(account, password)).await;
            assert!(matches!(result, Err(AppError::AuthError(ref m)) if m == LOGIN_FAILED));
        }
    }

    #[tokio::test]
    async fn test_login_by_phone() {
        let db = setup_db().await;
        let user = insert_user(&db, "phone@leaa.com").await;
        let mut am = user.into_active_model();
        am.phone = Set(Some("13800138000".to_string()));
        am.update(&db).await.unwrap();
        let service = AuthService::new(db.clone(), jwt());

        assert!(service.login(login("13800138000", TEST_PASSWORD)).await.is_ok());
    }

    #[tokio::test]
    async fn test_token_before_last_token_at_is_rejected() {
        let db = setup_db().await;
        let user = insert_user(&db, "staff@leaa.com").await;
        let service = AuthService::new(db.clone(), jwt());
        let token = jwt().generate_access_token(user.id).unwrap();

        let mut am = user.into_active_model();
        am.last_token_at = Set(Some(Utc::now() + Duration::seconds(5)));
        am.update(&db).await.unwrap();

        let result = service.authenticate(&token).await;
        assert!(matches!(result, Err(AppError::AuthError(_))));
    }

    #[tokio::test]
    async fn test_role_change_revokes_token_from_same_second() {
        let db = setup_db().await;
        let user = insert_user(&db, "staff@leaa.com").await;
        let role = insert_role(&db, "staff", &[Permission::CouponListRead]).await;
        let service = AuthService::new(db.clone(), jwt());
        let token = jwt().generate_access_token(user.id).unwrap();
        assert!(service.authenticate(&token).await.is_ok());

        let users = UserService::new(db.clone(), DemoConfig::default());
        let admin = auth_user(999, &[Permission::UserItemUpdate]);
        users
            .update_user(
                user.id,
                UpdateUserRequest {
                    role_ids: Some(vec![role.id]),
                    ..Default::default()
                },
                &admin,
            )
            .await
            .unwrap();

        let result = service.authenticate(&token).await;
        assert!(matches!(result, Err(AppError::AuthError(ref m)) if m == "Token has been revoked"));

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let fresh = service.login(login("staff@leaa.com", TEST_PASSWORD)).await.unwrap();
        assert!(service.authenticate(&fresh.access_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_bad_signature_is_token_error() {
        let db = setup_db().await;
        let user = insert_user(&db, "staff@leaa.com").await;
        let service = AuthService::new(db.clone(), jwt());
        let forged = JwtService::new("other-secret", 3600, 86400)
            .generate_access_token(user.id)
            .unwrap();

        let result = service.authenticate(&forged).await;
        assert!(matches!(result, Err(AppError::AuthError(ref m)) if m == TOKEN_ERROR));

        // a refresh token is not an access token
        let refresh = jwt().generate_refresh_token(user.id).unwrap();
        assert!(service.authenticate(&refresh).await.is_err());
        assert!(service.refresh_token(&refresh).await.is_ok());
    }

    #[tokio::test]
    async fn test_signup() {
        let db = setup_db().await;
        let service = AuthService::new(db.clone(), jwt());

        let response = service
            .signup(SignupRequest {
                email: "Someone@Leaa.com".to_string(),
                name: Some("Someone".to_string()),
                password: TEST_PASSWORD.to_string(),
            })
            .await
            .unwrap();
        assert_eq!(response.user.email, "someone@leaa.com");
        assert_eq!(response.user.status, 1);

        let again = service
            .signup(SignupRequest {
                email: "someone@leaa.com".to_string(),
                name: None,
                password: TEST_PASSWORD.to_string(),
            })
            .await;
        assert!(matches!(again, Err(AppError::ValidationError(_))));

        let weak = service
            .signup(SignupRequest {
                email: "weak@leaa.com".to_string(),
                name: None,
                password: "short".to_string(),
            })
            .await;
        assert!(matches!(weak, Err(AppError::ValidationError(_))));
    }
}
