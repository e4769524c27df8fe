use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use super::{handlers, middleware::auth_middleware};
use crate::AppState;

pub fn create_router(state: AppState) -> Router<AppState> {
    // Public auth routes
    let auth_routes = Router::new()
        .route("/signup", post(handlers::auth::sign_up))
        .route("/signin", post(handlers::auth::sign_in))
        .route("/refresh", post(handlers::auth::refresh_token));

    // Protected auth routes
    let auth_protected = Router::new()
        .route("/signout", post(handlers::auth::sign_out))
        .route("/signout-all", post(handlers::auth::sign_out_all))
        .route("/me", get(handlers::auth::current_user))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Contact routes (protected)
    let contact_routes = Router::new()
        .route(
            "/",
            get(handlers::contacts::list_contacts).post(handlers::contacts::create_contact),
        )
        .route("/recent", get(handlers::contacts::recent_contacts))
        .route("/search", get(handlers::contacts::search_contacts))
        .route(
            "/:id",
            get(handlers::contacts::get_contact)
                .put(handlers::contacts::update_contact)
                .delete(handlers::contacts::delete_contact),
        )
        .route("/:id/favorite", post(handlers::contacts::toggle_favorite))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Tag routes (protected)
    let tag_routes = Router::new()
        .route("/", get(handlers::tags::list_tags))
        .route("/unused", delete(handlers::tags::prune_unused_tags))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Combine all routes
    Router::new()
        .nest("/auth", auth_routes.merge(auth_protected))
        .nest("/contacts", contact_routes)
        .nest("/tags", tag_routes)
        .with_state(state)
}
