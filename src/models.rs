use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Roles ---

/// Role
///
/// The three user populations, totally ordered by privilege:
/// `Client < Trainer < Admin`. The derived `Ord` is the privilege hierarchy
/// used by the API access rules; area gating compares roles for equality
/// instead and must not use this ordering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Client,
    Trainer,
    Admin,
}

impl Role {
    /// Parses the stored `profiles.role` column. Anything unrecognized is
    /// treated as no role at all, which invalidates the session upstream.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "client" => Some(Role::Client),
            "trainer" => Some(Role::Trainer),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Trainer => "trainer",
            Role::Admin => "admin",
        }
    }

    /// Hierarchy policy: a caller satisfies a rule when their role is at
    /// least the rule's minimum. Higher roles inherit lower-role permissions.
    pub fn satisfies(&self, minimum: Role) -> bool {
        *self >= minimum
    }

    /// The landing area a signed-in user of this role is sent to.
    pub fn home_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin",
            Role::Trainer => "/trainer",
            Role::Client => "/client",
        }
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The canonical identity record stored in the `public.profiles` table,
/// mirroring the external auth provider's user id. The role is kept as text
/// here exactly as stored; it is parsed into [`Role`] during session
/// resolution.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    // Primary key, also the foreign key to the provider's auth.users table.
    pub id: Uuid,
    pub email: String,
    // RBAC field: 'client', 'trainer' or 'admin'.
    pub role: String,
    pub first_name: String,
    pub last_name: String,
}

/// TrainingPlan
///
/// A training plan authored by a trainer, from `public.training_plans`.
/// The primary data structure for the core business logic.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct TrainingPlan {
    pub id: Uuid,
    // FK to public.profiles.id (authoring trainer).
    pub trainer_id: Uuid,
    pub title: String,
    pub description: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Exercise
///
/// A single exercise row belonging to a plan, from `public.exercises`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Exercise {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub name: String,
    pub description: String,
    pub sets: i32,
    pub reps: i32,
    // Ordering of the exercise within its plan.
    pub position: i32,
}

/// PlanAssignment
///
/// One plan-to-client assignment in `public.plan_assignments`. The
/// `(plan_id, client_id)` pair is the composite primary key; inserts are
/// idempotent on it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PlanAssignment {
    pub plan_id: Uuid,
    pub client_id: Uuid,
    // The trainer (or admin) who made the assignment.
    pub assigned_by: Uuid,
}

/// Invitation
///
/// A pending account invitation from `public.invitations`. The row id doubles
/// as the activation token emailed to the invitee.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Invitation {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub first_name: String,
    pub last_name: String,
    pub invited_by: Uuid,
    pub accepted: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// Credentials for POST /api/auth/login. The password is passed through to
/// the external auth provider and never persisted or logged here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// ActivateAccountRequest
///
/// Input for POST /api/auth/activate: the invitation token from the emailed
/// link plus the invitee's chosen password.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ActivateAccountRequest {
    pub token: Uuid,
    pub password: String,
}

/// PasswordResetRequest
///
/// Input for POST /api/auth/reset-password. The response never discloses
/// whether the address has an account.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PasswordResetRequest {
    pub email: String,
}

/// InviteUserRequest
///
/// Admin payload for POST /api/users. Typed role: an unknown role string is
/// rejected at deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct InviteUserRequest {
    pub email: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
}

/// UpdateUserRoleRequest
///
/// Admin payload for PUT /api/users/{id}/role.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateUserRoleRequest {
    pub role: Role,
}

/// CreatePlanRequest
///
/// Input payload for submitting a new training plan (POST /api/plans).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePlanRequest {
    pub title: String,
    pub description: String,
}

/// UpdatePlanRequest
///
/// Partial update payload for PUT /api/plans/{id}. `Option<T>` fields with
/// `skip_serializing_if` so only provided fields travel in the JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePlanRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// AssignPlanRequest
///
/// Input for POST /api/plans/{id}/assign.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AssignPlanRequest {
    pub client_id: Uuid,
}

/// CreateExerciseRequest
///
/// Input payload for adding an exercise to a plan.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateExerciseRequest {
    pub name: String,
    pub description: String,
    pub sets: i32,
    pub reps: i32,
    pub position: i32,
}

/// UpdateExerciseRequest
///
/// Partial update payload for PUT /api/exercises/{id}.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateExerciseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sets: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reps: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
}

// --- Dashboard & Profile Schemas (Output) ---

/// UserProfile
///
/// Output schema for the authenticated caller's own profile (GET /api/me and
/// the login response).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub first_name: String,
    pub last_name: String,
}

/// AdminDashboardStats
///
/// Output schema for the administrative dashboard (GET /admin).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_users: i64,
    pub total_trainers: i64,
    pub total_clients: i64,
    pub total_plans: i64,
    /// Invitations that have been sent but not yet accepted.
    pub pending_invitations: i64,
}

/// TrainerDashboardStats
///
/// Output schema for the trainer dashboard (GET /trainer).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TrainerDashboardStats {
    pub total_plans: i64,
    /// Distinct clients with at least one of this trainer's plans assigned.
    pub assigned_clients: i64,
    pub total_exercises: i64,
}

/// ClientDashboard
///
/// Output schema for the client dashboard (GET /client): the plans currently
/// assigned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ClientDashboard {
    pub plans: Vec<TrainingPlan>,
}
