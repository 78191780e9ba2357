pub mod rest;
pub mod session;
pub mod token;

use std::{net::SocketAddr, sync::Arc};

use anyhow::anyhow;
use axum::{
    extract::Extension,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use self::rest::{account, auth, books, covers, health_check};
use crate::{
    domain::services::user::UserService,
    infrastructure::{
        config::Config,
        repositories::{
            book::BookRepositoryImpl, cover::CoverRepositoryImpl, user::UserRepositoryImpl,
        },
    },
    presentation::session::SessionRegistry,
};

pub const DASHBOARD_ROUTE: &str = "/private/dashboard";
pub const LOGIN_ROUTE: &str = "/login";

pub type Registry = SessionRegistry<BookRepositoryImpl, CoverRepositoryImpl, UserRepositoryImpl>;
pub type UserSvc = UserService<UserRepositoryImpl>;

pub(crate) fn session_cookie(token: &str) -> String {
    format!(
        "{}={token}; Path=/; HttpOnly; SameSite=Lax",
        token::SESSION_COOKIE
    )
}

pub(crate) fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; Max-Age=0", token::SESSION_COOKIE)
}

pub struct ServerBuilder {
    config: Option<Config>,
    user_svc: Option<UserSvc>,
    registry: Option<Arc<Registry>>,
    cover_repo: Option<CoverRepositoryImpl>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            user_svc: None,
            registry: None,
            cover_repo: None,
        }
    }

    pub fn with_config(self, config: Config) -> Self {
        Self {
            config: Some(config),
            ..self
        }
    }

    pub fn with_user_svc(self, user_svc: UserSvc) -> Self {
        Self {
            user_svc: Some(user_svc),
            ..self
        }
    }

    pub fn with_registry(self, registry: Arc<Registry>) -> Self {
        Self {
            registry: Some(registry),
            ..self
        }
    }

    pub fn with_cover_repo(self, cover_repo: CoverRepositoryImpl) -> Self {
        Self {
            cover_repo: Some(cover_repo),
            ..self
        }
    }

    pub fn build(self) -> Result<Server, anyhow::Error> {
        let config = self.config.ok_or_else(|| anyhow!("no config"))?;
        let user_svc = self.user_svc.ok_or_else(|| anyhow!("no user service"))?;
        let registry = self.registry.ok_or_else(|| anyhow!("no session registry"))?;
        let cover_repo = self.cover_repo.ok_or_else(|| anyhow!("no cover repository"))?;

        Ok(Server::new(config, user_svc, registry, cover_repo))
    }
}

pub struct Server {
    router: Router,
}

impl Server {
    pub fn new(
        config: Config,
        user_svc: UserSvc,
        registry: Arc<Registry>,
        cover_repo: CoverRepositoryImpl,
    ) -> Self {
        let router = Router::new()
            .route("/health", get(health_check))
            .route("/login", post(auth::login))
            .route("/register", post(auth::register))
            .route("/auth/callback", get(auth::callback))
            .route("/logout", post(auth::logout))
            .route("/api/library", get(books::get_library))
            .route("/api/books", post(books::add_books))
            .route(
                "/api/books/{id}",
                get(books::get_book)
                    .patch(books::update_book)
                    .delete(books::delete_book),
            )
            .route("/api/books/{id}/cover", put(books::upload_cover))
            .route("/api/update-account", patch(account::update_account))
            .route("/book-covers/{user_id}/{file}", get(covers::fetch_cover))
            .layer(Extension(config))
            .layer(Extension(user_svc))
            .layer(Extension(registry))
            .layer(Extension(cover_repo))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );

        Self { router }
    }

    pub async fn serve<A: Into<SocketAddr>>(self, addr: A) -> Result<(), anyhow::Error> {
        axum_server::bind(addr.into())
            .serve(self.router.into_make_service())
            .await?;

        Ok(())
    }
}
