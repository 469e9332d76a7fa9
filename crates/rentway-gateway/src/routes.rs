//! Built-in route table for the rental platform.
//!
//! One canonical top-level prefix per backend service.  A config file may
//! replace the rule list; backends always come from the service URLs.

use crate::settings::ServiceUrls;
use rentway_kernel::HttpMethod::{Delete, Get, Patch, Post, Put};
use rentway_kernel::{BackendDescriptor, RouteRule};

/// Backend descriptors for every rental microservice.
pub fn canonical_backends(urls: &ServiceUrls) -> Vec<BackendDescriptor> {
    vec![
        BackendDescriptor::new("users", &urls.user_service_url),
        BackendDescriptor::new("vehicles", &urls.vehicle_service_url),
        BackendDescriptor::new("rentals", &urls.rental_service_url),
        BackendDescriptor::new("payments", &urls.payment_service_url),
        BackendDescriptor::new("notifications", &urls.notification_service_url)
            .with_path_prefix("/api"),
        BackendDescriptor::new("admin", &urls.admin_service_url),
        BackendDescriptor::new("support", &urls.support_service_url).with_path_prefix("/api"),
        BackendDescriptor::new("ratings", &urls.rating_service_url),
    ]
}

/// Routing rules, in registration order.
pub fn canonical_routes() -> Vec<RouteRule> {
    let crud = vec![Get, Post, Put, Delete];
    vec![
        // users
        RouteRule::new("users.profile", "/users/profile", "users", "/users/profile")
            .with_methods(vec![Get]),
        RouteRule::new("users", "/users/*", "users", "/users/{path}")
            .with_methods(vec![Get, Post, Put, Delete, Patch]),
        // auth aliases served by the user service
        RouteRule::new("auth.login", "/auth/login", "users", "/users/login").with_methods(vec![Post]),
        RouteRule::new("auth.register", "/auth/register", "users", "/users/register")
            .with_methods(vec![Post]),
        RouteRule::new(
            "auth.forgot-password",
            "/auth/forgot-password",
            "users",
            "/users/forgot-password",
        )
        .with_methods(vec![Post]),
        RouteRule::new("auth", "/auth/*", "users", "/users/{path}").with_methods(crud.clone()),
        // vehicles
        RouteRule::new("vehicles.root", "/vehicles", "vehicles", "/vehicles")
            .with_methods(vec![Get, Post, Patch]),
        RouteRule::new("vehicles", "/vehicles/*", "vehicles", "/vehicles/{path}")
            .with_methods(vec![Get, Post, Delete, Patch]),
        // rentals
        RouteRule::new(
            "rentals.availability",
            "/rentals/availability",
            "rentals",
            "/rentals/availability",
        )
        .with_methods(vec![Get]),
        RouteRule::new("rentals", "/rentals/*", "rentals", "/rentals/{path}").with_methods(crud.clone()),
        // payments
        RouteRule::new("payments", "/payments/*", "payments", "/payments/{path}")
            .with_methods(crud.clone()),
        // notifications
        RouteRule::new(
            "notifications",
            "/notifications/*",
            "notifications",
            "/notifications/{path}",
        )
        .with_methods(crud.clone()),
        // admin
        RouteRule::new("admin.debug", "/admin/debug", "admin", "/debug").with_methods(vec![Get]),
        RouteRule::new("admin", "/admin/*", "admin", "/api/admin/{path}").with_methods(crud.clone()),
        // support
        RouteRule::new("support", "/support/*", "support", "/support/{path}").with_methods(crud),
        // ratings
        RouteRule::new("ratings.root", "/ratings", "ratings", "/").with_methods(vec![Get, Post]),
        RouteRule::new("ratings.user", "/ratings/user/*", "ratings", "/user/{path}")
            .with_methods(vec![Get]),
        RouteRule::new("ratings", "/ratings/*", "ratings", "/{path}").with_methods(vec![Get, Put, Delete]),
    ]
}
