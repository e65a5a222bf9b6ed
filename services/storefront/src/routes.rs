//! Storefront routes

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::{
    courier::ShipmentRequest,
    error::{ApiError, ApiResult},
    middleware::{admin_guard, chat_rate_limit, login_rate_limit},
    session::LoginOutcome,
    state::AppState,
    validation::{ShippingAddress, validate_login_request, validate_shipping_address},
};

/// Request for admin login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Create the router for the storefront service
pub fn create_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/admin", get(admin_dashboard))
        .route("/api/admin/shipments", post(create_shipment))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_guard));

    let login_routes = Router::new()
        .route("/api/admin/login", post(login))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            login_rate_limit,
        ));

    let chat_routes = Router::new()
        .route("/api/chat", post(chat))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            chat_rate_limit,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/admin/login", get(login_page))
        .route("/api/admin/logout", post(logout))
        .route("/api/admin/session", get(session_status))
        .route("/api/shipping/regions", get(list_regions))
        .route("/api/shipping/regions/:gouvernorat", get(region_villes))
        .route("/api/shipping/validate", post(validate_address))
        .merge(admin_routes)
        .merge(login_routes)
        .merge(chat_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "storefront"
    }))
}

/// Admin login endpoint
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Response> {
    let (username, password) =
        validate_login_request(payload.username.as_deref(), payload.password.as_deref())
            .map_err(ApiError::BadRequest)?;

    let outcome = state
        .session
        .login(jar, username, password)
        .map_err(|e| {
            error!("Failed to issue admin session: {}", e);
            ApiError::InternalServerError
        })?;

    match outcome {
        LoginOutcome::Authenticated { jar, claims } => {
            let body = Json(json!({
                "success": true,
                "expiresAt": claims.expires_at(),
            }));
            Ok((StatusCode::OK, jar, body).into_response())
        }
        LoginOutcome::Rejected => Err(ApiError::InvalidCredentials),
    }
}

/// Logout endpoint
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    info!("Admin logout");
    (
        state.session.logout(jar),
        Json(json!({"message": "Logged out successfully"})),
    )
}

/// Report whether the caller holds a valid admin session
pub async fn session_status(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let verdict = state.session.verify(&jar);
    Json(json!({
        "authenticated": verdict.is_authenticated(),
        "expiresAt": verdict.claims().and_then(|claims| claims.expires_at()),
    }))
}

/// Login page; already-authenticated admins go straight to the dashboard
pub async fn login_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    if state.session.verify(&jar).is_authenticated() {
        return Redirect::to("/admin").into_response();
    }
    Html(LOGIN_HTML).into_response()
}

/// Admin dashboard shell
pub async fn admin_dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

/// Shopping assistant endpoint
pub async fn chat(
    State(state): State<AppState>,
    Json(conversation): Json<Value>,
) -> ApiResult<impl IntoResponse> {
    let (status, body) = state.chat.forward(&conversation).await?;
    Ok((status, Json(body)))
}

/// Full gouvernorat → villes map for checkout dropdowns
pub async fn list_regions(State(state): State<AppState>) -> impl IntoResponse {
    let lookup = state.regions.resolve().await;
    Json(json!({
        "origin": lookup.origin,
        "regions": lookup.regions.as_ref(),
    }))
}

/// Villes of one gouvernorat
pub async fn region_villes(
    State(state): State<AppState>,
    Path(gouvernorat): Path<String>,
) -> impl IntoResponse {
    let villes = state.regions.villes_for(&gouvernorat).await;
    Json(json!({
        "gouvernorat": gouvernorat,
        "villes": villes,
    }))
}

/// Check a checkout address without creating anything
pub async fn validate_address(
    State(state): State<AppState>,
    Json(address): Json<ShippingAddress>,
) -> impl IntoResponse {
    match check_address(&state, &address).await {
        Ok(()) => Json(json!({ "valid": true })),
        Err(message) => Json(json!({ "valid": false, "error": message })),
    }
}

/// Hand an order over to the courier
pub async fn create_shipment(
    State(state): State<AppState>,
    Json(shipment): Json<ShipmentRequest>,
) -> ApiResult<impl IntoResponse> {
    if shipment.order_reference.trim().is_empty() {
        return Err(ApiError::BadRequest("Order reference is required".to_string()));
    }
    if shipment.item_count == 0 {
        return Err(ApiError::BadRequest("Item count must be positive".to_string()));
    }
    if !shipment.declared_value.is_finite() || shipment.declared_value < 0.0 {
        return Err(ApiError::BadRequest(
            "Declared value must be a non-negative amount".to_string(),
        ));
    }

    let recipient = &shipment.recipient;
    let address = ShippingAddress {
        name: recipient.name.clone(),
        address: recipient.address.clone(),
        gouvernorat: recipient.gouvernorat.clone(),
        ville: recipient.ville.clone(),
        phone: recipient.phone.clone(),
    };
    check_address(&state, &address)
        .await
        .map_err(ApiError::BadRequest)?;

    let outcome = state.courier.create_shipment(&shipment).await;

    Ok(Json(json!({
        "orderReference": shipment.order_reference,
        "shipment": outcome,
    })))
}

async fn check_address(state: &AppState, address: &ShippingAddress) -> Result<(), String> {
    let regions = state.regions.region_map().await;
    let villes = regions
        .get(address.gouvernorat.trim())
        .ok_or_else(|| format!("Unknown gouvernorat: {}", address.gouvernorat))?;

    validate_shipping_address(address, villes)
}

const LOGIN_HTML: &str = r#"<!doctype html>
<html lang="fr">
<head><meta charset="utf-8"><title>Admin login</title></head>
<body>
<form id="login">
  <input name="username" autocomplete="username" required>
  <input name="password" type="password" autocomplete="current-password" required>
  <button type="submit">Se connecter</button>
</form>
<script>
document.getElementById("login").addEventListener("submit", async (event) => {
  event.preventDefault();
  const form = new FormData(event.target);
  const response = await fetch("/api/admin/login", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify(Object.fromEntries(form)),
  });
  if (response.ok) { window.location.href = "/admin"; }
});
</script>
</body>
</html>
"#;

const DASHBOARD_HTML: &str = r#"<!doctype html>
<html lang="fr">
<head><meta charset="utf-8"><title>Admin</title></head>
<body>
<h1>Tableau de bord</h1>
<form method="post" action="/api/admin/logout"><button type="submit">Déconnexion</button></form>
</body>
</html>
"#;
