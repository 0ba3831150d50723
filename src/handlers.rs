use crate::{
    AppState,
    access::ApiError,
    auth::{AuthUser, SESSION_COOKIE},
    config::Env,
    models::{
        self, ActivateAccountRequest, AdminDashboardStats, AssignPlanRequest, ClientDashboard,
        CreateExerciseRequest, CreatePlanRequest, Exercise, Invitation, InviteUserRequest,
        LoginRequest, PasswordResetRequest, PlanAssignment, Role, TrainerDashboardStats,
        TrainingPlan, UpdateExerciseRequest, UpdatePlanRequest, UpdateUserRoleRequest, User,
        UserProfile,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use uuid::Uuid;

// --- Filter Structs ---

/// UserFilter
///
/// Accepted query parameters for GET /api/users.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct UserFilter {
    /// Optional role to restrict the listing to.
    pub role: Option<Role>,
}

// --- Auth Provider Wire Structs ---

/// Minimal deserialization of the provider's password-grant response.
#[derive(Deserialize)]
struct AuthTokenResponse {
    access_token: String,
}

/// Minimal deserialization of the provider's signup response, capturing the
/// canonical user UUID.
#[derive(Deserialize)]
struct AuthSignupResponse {
    id: Uuid,
}

fn profile_of(user: User) -> UserProfile {
    UserProfile {
        id: user.id,
        email: user.email,
        role: user.role,
        first_name: user.first_name,
        last_name: user.last_name,
    }
}

/// Plan visibility shared by the plan detail and exercise listing handlers:
/// the owning trainer, an assigned client, or an admin.
async fn plan_visible_to(state: &AppState, plan: &TrainingPlan, auth: &AuthUser) -> bool {
    match auth.role {
        Role::Admin => true,
        Role::Trainer => plan.trainer_id == auth.id,
        Role::Client => state.repo.is_plan_assigned(plan.id, auth.id).await,
    }
}

// --- Auth Handlers ---

/// login
///
/// [Public Route] Exchanges credentials for a session. Credentials are
/// forwarded to the external auth provider's password grant; on success the
/// returned access token becomes the HttpOnly session cookie and the caller's
/// profile is returned.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = UserProfile),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<UserProfile>), ApiError> {
    let client = reqwest::Client::new();
    let token_url = format!("{}/auth/v1/token?grant_type=password", state.config.auth_url);

    let response = client
        .post(token_url)
        .header("apikey", &state.config.auth_api_key)
        .json(&serde_json::json!({ "email": payload.email, "password": payload.password }))
        .send()
        .await
        .map_err(|_| ApiError::internal())?;

    if !response.status().is_success() {
        return Err(ApiError::unauthorized());
    }

    let token: AuthTokenResponse = response.json().await.map_err(|_| ApiError::internal())?;

    // The profile mirror must exist for the session to be usable at all.
    let user = state
        .repo
        .get_user_by_email(&payload.email)
        .await
        .ok_or_else(ApiError::unauthorized)?;

    let mut cookie = Cookie::build((SESSION_COOKIE, token.access_token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    if state.config.env == Env::Production {
        cookie = cookie.secure(true);
    }

    Ok((jar.add(cookie), Json(profile_of(user))))
}

/// get_invitation
///
/// [Public Route] Looks up a pending invitation by its token so the
/// activation page can prefill email and name. Used invitations are not
/// disclosed.
#[utoipa::path(
    get,
    path = "/api/auth/invite/{token}",
    params(("token" = Uuid, Path, description = "Invitation token")),
    responses(
        (status = 200, description = "Pending invitation", body = Invitation),
        (status = 404, description = "Unknown or already used")
    )
)]
pub async fn get_invitation(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
) -> Result<Json<Invitation>, ApiError> {
    match state.repo.get_invitation(token).await {
        Some(invitation) if !invitation.accepted => Ok(Json(invitation)),
        _ => Err(ApiError::not_found()),
    }
}

/// activate_account
///
/// [Public Route] Completes an invitation: creates the account at the auth
/// provider with the invitee's chosen password, mirrors the profile row
/// locally under the provider-issued id, and consumes the invitation.
#[utoipa::path(
    post,
    path = "/api/auth/activate",
    request_body = ActivateAccountRequest,
    responses(
        (status = 200, description = "Account activated", body = User),
        (status = 404, description = "Unknown invitation"),
        (status = 409, description = "Invitation already used")
    )
)]
pub async fn activate_account(
    State(state): State<AppState>,
    Json(payload): Json<ActivateAccountRequest>,
) -> Result<Json<User>, ApiError> {
    let invitation = state
        .repo
        .get_invitation(payload.token)
        .await
        .ok_or_else(ApiError::not_found)?;

    if invitation.accepted {
        return Err(ApiError::conflict("Invitation already used"));
    }

    // Step 1: create the credentials at the external auth provider.
    let client = reqwest::Client::new();
    let signup_url = format!("{}/auth/v1/signup", state.config.auth_url);

    let response = client
        .post(signup_url)
        .header("apikey", &state.config.auth_api_key)
        .json(&serde_json::json!({ "email": invitation.email, "password": payload.password }))
        .send()
        .await
        .map_err(|_| ApiError::internal())?;

    if !response.status().is_success() {
        // Provider rejection (weak password, email already registered).
        return Err(ApiError::bad_request("Account could not be created"));
    }

    // Step 2: extract the canonical user id from the provider response.
    let created: AuthSignupResponse = response.json().await.map_err(|_| ApiError::internal())?;

    // Step 3: mirror the profile locally, keyed by the provider id.
    let user = state
        .repo
        .create_user(User {
            id: created.id,
            email: invitation.email.clone(),
            role: invitation.role.clone(),
            first_name: invitation.first_name.clone(),
            last_name: invitation.last_name.clone(),
        })
        .await;

    state.repo.mark_invitation_accepted(invitation.id).await;

    Ok(Json(user))
}

/// request_password_reset
///
/// [Public Route] Starts the provider-managed recovery flow. Always responds
/// 202 so the endpoint cannot be used to probe which addresses have accounts.
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = PasswordResetRequest,
    responses((status = 202, description = "Recovery initiated if the account exists"))
)]
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetRequest>,
) -> StatusCode {
    let client = reqwest::Client::new();
    let recover_url = format!("{}/auth/v1/recover", state.config.auth_url);

    let result = client
        .post(recover_url)
        .header("apikey", &state.config.auth_api_key)
        .json(&serde_json::json!({ "email": payload.email }))
        .send()
        .await;

    if let Err(e) = result {
        tracing::error!("password recovery call failed: {}", e);
    }

    StatusCode::ACCEPTED
}

/// get_me
///
/// [Authenticated Route] The caller's own profile, straight from the resolved
/// session identity.
#[utoipa::path(
    get,
    path = "/api/me",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_me(auth: AuthUser) -> Json<UserProfile> {
    Json(UserProfile {
        id: auth.id,
        email: auth.email,
        role: auth.role.as_str().to_string(),
        first_name: auth.first_name,
        last_name: auth.last_name,
    })
}

// --- User Administration ---

/// list_users
///
/// [Trainer+ Route] Lists profiles, optionally filtered by role. Trainers use
/// this to pick assignment targets; admins for user management.
#[utoipa::path(
    get,
    path = "/api/users",
    params(UserFilter),
    responses((status = 200, description = "Profiles", body = [User]))
)]
pub async fn list_users(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
) -> Result<Json<Vec<User>>, ApiError> {
    if !auth.role.satisfies(Role::Trainer) {
        return Err(ApiError::forbidden());
    }
    Ok(Json(state.repo.list_users(filter.role).await))
}

/// invite_user
///
/// [Admin Route] Creates an invitation and emails the activation link. The
/// account itself is created later, when the invitee activates.
///
/// The gate already requires admin for POST /api/users; the handler checks
/// again before touching the repository.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = InviteUserRequest,
    responses(
        (status = 201, description = "Invitation created", body = Invitation),
        (status = 403, description = "Not an admin"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn invite_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<InviteUserRequest>,
) -> Result<(StatusCode, Json<Invitation>), ApiError> {
    if auth.role != Role::Admin {
        return Err(ApiError::forbidden());
    }

    if state.repo.get_user_by_email(&payload.email).await.is_some() {
        return Err(ApiError::conflict("Email already registered"));
    }

    let invitation = state
        .repo
        .create_invitation(Invitation {
            id: Uuid::new_v4(),
            email: payload.email,
            role: payload.role.as_str().to_string(),
            first_name: payload.first_name,
            last_name: payload.last_name,
            invited_by: auth.id,
            accepted: false,
            created_at: chrono::Utc::now(),
        })
        .await;

    // Mail failure must not lose the invitation; the admin can resend.
    if let Err(e) = state
        .mailer
        .send_invitation(&invitation.email, &invitation.first_name, invitation.id)
        .await
    {
        tracing::error!("invitation email failed: {}", e);
    }

    Ok((StatusCode::CREATED, Json(invitation)))
}

/// update_user_role
///
/// [Admin Route] Changes a profile's stored role. Takes effect on the
/// target's next request, when their session re-resolves.
#[utoipa::path(
    put,
    path = "/api/users/{id}/role",
    params(("id" = Uuid, Path, description = "Profile ID")),
    request_body = UpdateUserRoleRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user_role(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRoleRequest>,
) -> Result<Json<User>, ApiError> {
    if auth.role != Role::Admin {
        return Err(ApiError::forbidden());
    }
    match state.repo.update_user_role(id, payload.role).await {
        Some(user) => Ok(Json(user)),
        None => Err(ApiError::not_found()),
    }
}

/// delete_user
///
/// [Admin Route] Removes a profile. The provider-side account is left to the
/// provider's own administration.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "Profile ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if auth.role != Role::Admin {
        return Err(ApiError::forbidden());
    }
    if state.repo.delete_user(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found())
    }
}

// --- Training Plans ---

/// list_plans
///
/// [Authenticated Route] Role-aware plan listing: clients see what is
/// assigned to them, trainers what they authored, admins everything.
#[utoipa::path(
    get,
    path = "/api/plans",
    responses((status = 200, description = "Plans", body = [TrainingPlan]))
)]
pub async fn list_plans(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Json<Vec<models::TrainingPlan>> {
    let plans = match auth.role {
        Role::Admin => state.repo.list_all_plans().await,
        Role::Trainer => state.repo.list_plans_for_trainer(auth.id).await,
        Role::Client => state.repo.list_plans_assigned_to(auth.id).await,
    };
    Json(plans)
}

/// create_plan
///
/// [Trainer+ Route] Creates a plan authored by the session identity.
#[utoipa::path(
    post,
    path = "/api/plans",
    request_body = CreatePlanRequest,
    responses((status = 200, description = "Created", body = TrainingPlan))
)]
pub async fn create_plan(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePlanRequest>,
) -> Result<Json<models::TrainingPlan>, ApiError> {
    if !auth.role.satisfies(Role::Trainer) {
        return Err(ApiError::forbidden());
    }
    let plan = state.repo.create_plan(payload, auth.id).await;
    Ok(Json(plan))
}

/// get_plan
///
/// [Authenticated Route] Plan detail, visible to the owning trainer, assigned
/// clients and admins. Everyone else gets the same 404 as a missing plan.
#[utoipa::path(
    get,
    path = "/api/plans/{id}",
    params(("id" = Uuid, Path, description = "Plan ID")),
    responses(
        (status = 200, description = "Found", body = TrainingPlan),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_plan(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<models::TrainingPlan>, ApiError> {
    let plan = state.repo.get_plan(id).await.ok_or_else(ApiError::not_found)?;
    if !plan_visible_to(&state, &plan, &auth).await {
        return Err(ApiError::not_found());
    }
    Ok(Json(plan))
}

/// update_plan
///
/// [Trainer Route] Partial update of the caller's own plan. A non-owner gets
/// 404: the repository query matches zero rows.
#[utoipa::path(
    put,
    path = "/api/plans/{id}",
    params(("id" = Uuid, Path, description = "Plan ID")),
    request_body = UpdatePlanRequest,
    responses(
        (status = 200, description = "Updated", body = TrainingPlan),
        (status = 404, description = "Not Found or Not Owner")
    )
)]
pub async fn update_plan(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePlanRequest>,
) -> Result<Json<models::TrainingPlan>, ApiError> {
    match state.repo.update_plan(id, auth.id, payload).await {
        Some(plan) => Ok(Json(plan)),
        None => Err(ApiError::not_found()),
    }
}

/// delete_plan
///
/// [Trainer Route] Two-tier deletion: admins may delete any plan, trainers
/// only their own.
#[utoipa::path(
    delete,
    path = "/api/plans/{id}",
    params(("id" = Uuid, Path, description = "Plan ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_plan(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = if auth.role == Role::Admin {
        state.repo.delete_plan_admin(id).await
    } else {
        state.repo.delete_plan(id, auth.id).await
    };
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found())
    }
}

/// assign_plan
///
/// [Trainer+ Route] Assigns the plan to a client and emails them about it.
/// The composite key on `plan_assignments` makes the operation idempotent; a
/// repeat assignment returns 409 and sends no second email.
#[utoipa::path(
    post,
    path = "/api/plans/{id}/assign",
    params(("id" = Uuid, Path, description = "Plan ID")),
    request_body = AssignPlanRequest,
    responses(
        (status = 200, description = "Assigned"),
        (status = 404, description = "Plan or client not found"),
        (status = 409, description = "Already assigned")
    )
)]
pub async fn assign_plan(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
    Json(payload): Json<AssignPlanRequest>,
) -> Result<StatusCode, ApiError> {
    let plan = state
        .repo
        .get_plan(plan_id)
        .await
        .ok_or_else(ApiError::not_found)?;

    // Only the owning trainer or an admin may hand the plan out.
    if auth.role != Role::Admin && plan.trainer_id != auth.id {
        return Err(ApiError::not_found());
    }

    // The target must be an existing client profile.
    let client = state
        .repo
        .get_user(payload.client_id)
        .await
        .ok_or_else(ApiError::not_found)?;
    if Role::from_str(&client.role) != Some(Role::Client) {
        return Err(ApiError::bad_request("Assignment target is not a client"));
    }

    let inserted = state
        .repo
        .assign_plan(PlanAssignment {
            plan_id,
            client_id: client.id,
            assigned_by: auth.id,
        })
        .await;

    if !inserted {
        return Err(ApiError::conflict("Plan already assigned to this client"));
    }

    let trainer_name = format!("{} {}", auth.first_name, auth.last_name);
    if let Err(e) = state
        .mailer
        .send_plan_assigned(&client.email, &plan.title, &trainer_name)
        .await
    {
        tracing::error!("plan-assigned email failed: {}", e);
    }

    Ok(StatusCode::OK)
}

// --- Exercises ---

/// list_exercises
///
/// [Authenticated Route] Exercises of a plan, under the same visibility as
/// the plan itself.
#[utoipa::path(
    get,
    path = "/api/plans/{id}/exercises",
    params(("id" = Uuid, Path, description = "Plan ID")),
    responses(
        (status = 200, description = "Exercises", body = [Exercise]),
        (status = 404, description = "Not Found")
    )
)]
pub async fn list_exercises(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<Vec<models::Exercise>>, ApiError> {
    let plan = state
        .repo
        .get_plan(plan_id)
        .await
        .ok_or_else(ApiError::not_found)?;
    if !plan_visible_to(&state, &plan, &auth).await {
        return Err(ApiError::not_found());
    }
    Ok(Json(state.repo.get_exercises(plan_id).await))
}

/// add_exercise
///
/// [Trainer Route] Appends an exercise to the caller's own plan (admins may
/// edit any plan).
#[utoipa::path(
    post,
    path = "/api/plans/{id}/exercises",
    params(("id" = Uuid, Path, description = "Plan ID")),
    request_body = CreateExerciseRequest,
    responses(
        (status = 200, description = "Added", body = Exercise),
        (status = 404, description = "Not Found or Not Owner")
    )
)]
pub async fn add_exercise(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
    Json(payload): Json<CreateExerciseRequest>,
) -> Result<Json<models::Exercise>, ApiError> {
    let plan = state
        .repo
        .get_plan(plan_id)
        .await
        .ok_or_else(ApiError::not_found)?;
    if auth.role != Role::Admin && plan.trainer_id != auth.id {
        return Err(ApiError::not_found());
    }
    let exercise = state.repo.add_exercise(plan_id, payload).await;
    Ok(Json(exercise))
}

/// update_exercise
///
/// [Trainer Route] Partial update; ownership is enforced through the plan
/// join in the repository query.
#[utoipa::path(
    put,
    path = "/api/exercises/{id}",
    params(("id" = Uuid, Path, description = "Exercise ID")),
    request_body = UpdateExerciseRequest,
    responses(
        (status = 200, description = "Updated", body = Exercise),
        (status = 404, description = "Not Found or Not Owner")
    )
)]
pub async fn update_exercise(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateExerciseRequest>,
) -> Result<Json<models::Exercise>, ApiError> {
    match state.repo.update_exercise(id, auth.id, payload).await {
        Some(exercise) => Ok(Json(exercise)),
        None => Err(ApiError::not_found()),
    }
}

/// delete_exercise
///
/// [Trainer Route] Two-tier deletion, mirroring plan deletion: admin
/// override, otherwise owner-scoped.
#[utoipa::path(
    delete,
    path = "/api/exercises/{id}",
    params(("id" = Uuid, Path, description = "Exercise ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_exercise(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = if auth.role == Role::Admin {
        state.repo.delete_exercise_admin(id).await
    } else {
        state.repo.delete_exercise(id, auth.id).await
    };
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found())
    }
}

// --- Dashboards ---

/// admin_dashboard
///
/// [Admin Area] Aggregate counters for the admin landing area. The gate
/// enforces the exact-role match; the handler re-checks.
#[utoipa::path(
    get,
    path = "/admin",
    responses((status = 200, description = "Stats", body = AdminDashboardStats))
)]
pub async fn admin_dashboard(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AdminDashboardStats>, ApiError> {
    if auth.role != Role::Admin {
        return Err(ApiError::forbidden());
    }
    Ok(Json(state.repo.get_stats().await))
}

/// trainer_dashboard
///
/// [Trainer Area] The caller's plan, client and exercise counters.
#[utoipa::path(
    get,
    path = "/trainer",
    responses((status = 200, description = "Stats", body = TrainerDashboardStats))
)]
pub async fn trainer_dashboard(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<TrainerDashboardStats>, ApiError> {
    if auth.role != Role::Trainer {
        return Err(ApiError::forbidden());
    }
    Ok(Json(state.repo.get_trainer_stats(auth.id).await))
}

/// client_dashboard
///
/// [Client Area] The caller's currently assigned plans.
#[utoipa::path(
    get,
    path = "/client",
    responses((status = 200, description = "Dashboard", body = ClientDashboard))
)]
pub async fn client_dashboard(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ClientDashboard>, ApiError> {
    if auth.role != Role::Client {
        return Err(ApiError::forbidden());
    }
    let plans = state.repo.list_plans_assigned_to(auth.id).await;
    Ok(Json(ClientDashboard { plans }))
}
