/// Router Module Index
///
/// Organizes the routing surface into access-tiered modules. The tiers are
/// descriptive: actual enforcement happens in the router-wide access gate,
/// which classifies each path and applies the rule table before any handler
/// runs.

/// Endpoints reachable without a session: health, the landing page and the
/// public slice of the auth API.
pub mod public;

/// The authenticated API surface (profiles, plans, exercises). Minimum roles
/// come from the access-rule table.
pub mod api;

/// Role-scoped dashboard areas (`/admin`, `/trainer`, `/client`), gated by
/// exact role match.
pub mod areas;
