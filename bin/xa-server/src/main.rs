//! Extended API Server
//!
//! Admin endpoints in front of the platform:
//! - Auto-shutdown policy push, mutation management, user roles / activation
//! - Environment and project listing enrichment
//! - Lookup table refresh and health probes
//!
//! ## Configuration
//!
//! Settings come from `xa_config` (TOML file plus environment overrides).
//! The most common overrides:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `EXTENDED_API_PORT` | `5000` | HTTP port |
//! | `PLATFORM_NAMESPACE` | `domino-platform` | Namespace for platform services and mutations |
//! | `SYSTEM_NAMESPACE` | `domino-system` | Namespace holding the credential store |
//! | `MONGO_HOST` | replica set service | MongoDB host and port |
//! | `MONGO_PASSWORD` | credential store | MongoDB password |
//! | `DOMINO_NUCLEUS_URI` | `http://nucleus-frontend.domino-platform:80` | Platform front-end |
//! | `LOG_LEVEL` | `warn` | Log level (`RUST_LOG` wins when set) |

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use xa_config::{AppConfig, ConfigLoader};
use xa_platform::api::{
    AppState, AuthLayer,
    health_router, HealthState,
    cache_router, cache_legacy_router, CacheState,
    environments_router, environments_legacy_router, EnvironmentsState,
    projects_router, projects_legacy_router, ProjectsState,
    autoshutdown_router, autoshutdown_legacy_router, AutoShutdownState,
    mutations_router, MutationsState,
    user_management_router, UserManagementState,
};
use xa_platform::repository::{
    AutoShutdownRepository, EnvironmentRevisionRepository, ProjectRepository, UserRepository,
};
use xa_platform::{
    BaseImageResolver, CredentialSource, CredentialStore, EnvironmentRevisionCache,
    KeycloakAdminClient, KeycloakAdminConfig, KubeMutationStore, NucleusClient, ProjectCache,
    SystemCredentials,
};

#[derive(Parser, Debug)]
#[command(name = "xa-server", version, about = "Extended API server")]
struct Args {
    /// Platform front-end base URI (overrides configuration)
    nucleus_uri: Option<String>,

    /// Configuration file
    #[arg(short, long, env = "EXTENDED_API_CONFIG")]
    config: Option<PathBuf>,
}

/// Credentials the server needs that may come from the credential store.
struct ResolvedCredentials {
    mongo_username: String,
    mongo_password: String,
    /// MongoDB account came from the credential store
    mongo_stored: bool,
    keycloak_username: String,
    keycloak_password: String,
}

async fn resolve_credentials(config: &AppConfig, kube_client: &kube::Client) -> Result<ResolvedCredentials> {
    let mongo_configured = config.mongodb.uri.is_some() || config.mongodb.password.is_some();
    let keycloak_configured = config.keycloak.username.is_some() && config.keycloak.password.is_some();

    let stored = if mongo_configured && keycloak_configured {
        SystemCredentials::default()
    } else {
        let store = CredentialStore::new(
            kube_client.clone(),
            &config.namespaces.system,
            &config.credentials.secret_name,
            &config.credentials.secret_key,
        );
        store
            .load()
            .await
            .context("Failed to read platform credential store")?
    };

    let (mongo_username, mongo_password, mongo_stored) = match (&config.mongodb.password, &stored.mongodb) {
        (Some(password), _) => (config.mongodb.username.clone(), password.clone(), false),
        (None, Some(creds)) => (creds.admin_username.clone(), creds.admin_password.clone(), true),
        (None, None) if config.mongodb.uri.is_some() => (String::new(), String::new(), false),
        (None, None) => anyhow::bail!("No MongoDB password configured or stored"),
    };

    let (keycloak_username, keycloak_password) =
        match (&config.keycloak.username, &config.keycloak.password, &stored.keycloak) {
            (Some(user), Some(password), _) => (user.clone(), password.clone()),
            (_, _, Some(creds)) => (creds.username.clone(), creds.password.clone()),
            _ => anyhow::bail!("No Keycloak credentials configured or stored"),
        };

    Ok(ResolvedCredentials {
        mongo_username,
        mongo_password,
        mongo_stored,
        keycloak_username,
        keycloak_password,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let loader = match &args.config {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load().context("Failed to load configuration")?;
    if let Some(uri) = args.nucleus_uri {
        config.nucleus.uri = uri;
    }

    xa_common::logging::init_logging("xa-server", &config.logging.level, &config.logging.format);
    info!(nucleus = %config.nucleus.uri, "Starting Extended API Server");

    // Kubernetes (mutations + credential store)
    let kube_client = kube::Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let credentials = resolve_credentials(&config, &kube_client).await?;

    // Connect to MongoDB
    let mongo_uri = if credentials.mongo_stored {
        config.mongodb.stored_connection_string(
            &config.namespaces.platform,
            &credentials.mongo_username,
            &credentials.mongo_password,
        )
    } else {
        config.mongodb.connection_string(
            &config.namespaces.platform,
            &credentials.mongo_username,
            &credentials.mongo_password,
        )
    };
    info!(
        host = %config.mongodb.host_or_default(&config.namespaces.platform),
        database = %config.mongodb.database,
        "Connecting to MongoDB"
    );
    let mongo_client = mongodb::Client::with_uri_str(&mongo_uri).await?;
    let db = mongo_client.database(&config.mongodb.database);

    // Upstream clients
    let nucleus = Arc::new(NucleusClient::new(config.nucleus.uri.clone()));
    let platform_version = match nucleus.platform_version().await {
        Ok(version) => version,
        Err(e) => {
            warn!(error = %e, "Could not read platform version, role updates disabled");
            None
        }
    };
    info!(version = ?platform_version, "Platform version");

    let keycloak = Arc::new(KeycloakAdminClient::new(KeycloakAdminConfig {
        server_url: config.keycloak.server_url.clone(),
        realm: config.keycloak.realm.clone(),
        user_realm: config.keycloak.user_realm.clone(),
        client_id: config.keycloak.client_id.clone(),
        username: credentials.keycloak_username,
        password: credentials.keycloak_password,
    }));

    // Repositories and lookup tables
    let revisions = Arc::new(EnvironmentRevisionCache::new(Arc::new(EnvironmentRevisionRepository::new(&db))));
    let projects = Arc::new(ProjectCache::new(Arc::new(ProjectRepository::new(&db))));
    let resolver = Arc::new(BaseImageResolver::new(revisions.clone()));
    let autoshutdown_repo = Arc::new(AutoShutdownRepository::new(&db));
    let user_repo = Arc::new(UserRepository::new(&db));
    let mutation_store = Arc::new(KubeMutationStore::new(kube_client, &config.namespaces.platform));
    info!("Repositories initialized");

    // Warm the lookup tables; a failure here only delays loading to first use
    if let Err(e) = revisions.refresh().await {
        warn!(error = %e, "Initial environment revision load failed");
    }
    if let Err(e) = projects.refresh().await {
        warn!(error = %e, "Initial project load failed");
    }

    let app_state = AppState::new(nucleus.clone());

    // Build API states
    let cache_state = CacheState {
        revisions,
        projects: projects.clone(),
    };
    let environments_state = EnvironmentsState {
        upstream: nucleus.clone(),
        resolver,
    };
    let projects_state = ProjectsState {
        upstream: nucleus,
        projects,
    };
    let autoshutdown_state = AutoShutdownState { store: autoshutdown_repo };
    let mutations_state = MutationsState { store: mutation_store };
    let user_management_state = UserManagementState {
        platform_version,
        identity: keycloak,
        users: user_repo,
    };
    let health_state = HealthState::new(Some(db), Some(env!("CARGO_PKG_VERSION").to_string()))
        .with_platform_version(platform_version.map(|v| v.to_string()));

    let (router, mut openapi) = OpenApiRouter::new()
        .merge(cache_router(cache_state.clone()))
        .merge(environments_router(environments_state.clone()))
        .merge(projects_router(projects_state.clone()))
        .merge(autoshutdown_router(autoshutdown_state.clone()))
        .nest("/mutation", mutations_router(mutations_state))
        .nest("/user-management", user_management_router(user_management_state))
        .split_for_parts();

    openapi.info.title = "Extended API".to_string();
    openapi.info.version = env!("CARGO_PKG_VERSION").to_string();
    openapi.info.description = Some("Administrative extensions to the platform API".to_string());

    let app = Router::new()
        .merge(router)
        // Paths served by earlier releases
        .merge(cache_legacy_router(cache_state))
        .merge(environments_legacy_router(environments_state))
        .merge(projects_legacy_router(projects_state))
        .merge(autoshutdown_legacy_router(autoshutdown_state))
        .merge(health_router(health_state.clone()))
        .merge(SwaggerUi::new("/swagger-ui").url("/q/openapi", openapi))
        .layer(AuthLayer::new(app_state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    let addr = format!("{}:{}", config.http.host, config.http.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("API server listening on http://{}", addr);

    health_state.set_ready();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Extended API Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
