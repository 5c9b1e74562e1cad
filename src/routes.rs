// Route path constants - single source of truth for all API paths

pub const HEALTH: &str = "/health";
pub const APP_ROUTES: &str = "/apps/{app}/routes";
pub const APP_ROUTE: &str = "/apps/{app}/routes/{*path}";
pub const OPENAPI_JSON: &str = "/api-docs/openapi.json";
pub const SWAGGER_UI: &str = "/swagger-ui";
