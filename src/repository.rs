use crate::models::{
    AdminDashboardStats, CreateExerciseRequest, CreatePlanRequest, Exercise, Invitation,
    PlanAssignment, Role, TrainerDashboardStats, TrainingPlan, UpdateExerciseRequest,
    UpdatePlanRequest, User,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Abstract contract for all persistence operations, letting the handlers
/// talk to the data layer without knowing the implementation (Postgres in
/// production, in-memory stores in tests).
///
/// `Send + Sync + async_trait` make the trait object (`Arc<dyn Repository>`)
/// shareable across the async request pipeline.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Profiles ---
    async fn get_user(&self, id: Uuid) -> Option<User>;
    async fn get_user_by_email(&self, email: &str) -> Option<User>;
    async fn create_user(&self, user: User) -> User;
    // Listing with optional role filter.
    async fn list_users(&self, role: Option<Role>) -> Vec<User>;
    async fn update_user_role(&self, id: Uuid, role: Role) -> Option<User>;
    async fn delete_user(&self, id: Uuid) -> bool;

    // --- Invitations ---
    async fn create_invitation(&self, invitation: Invitation) -> Invitation;
    async fn get_invitation(&self, id: Uuid) -> Option<Invitation>;
    async fn mark_invitation_accepted(&self, id: Uuid) -> bool;

    // --- Training Plans ---
    // Admin access: every plan in the system.
    async fn list_all_plans(&self) -> Vec<TrainingPlan>;
    async fn list_plans_for_trainer(&self, trainer_id: Uuid) -> Vec<TrainingPlan>;
    async fn list_plans_assigned_to(&self, client_id: Uuid) -> Vec<TrainingPlan>;
    async fn get_plan(&self, id: Uuid) -> Option<TrainingPlan>;
    async fn create_plan(&self, req: CreatePlanRequest, trainer_id: Uuid) -> TrainingPlan;
    // Owner-only: updates only when `trainer_id` matches. COALESCE partial update.
    async fn update_plan(
        &self,
        id: Uuid,
        trainer_id: Uuid,
        req: UpdatePlanRequest,
    ) -> Option<TrainingPlan>;
    // Owner-only delete.
    async fn delete_plan(&self, id: Uuid, trainer_id: Uuid) -> bool;
    /// Admin override: delete ANY plan by id, no ownership check.
    async fn delete_plan_admin(&self, id: Uuid) -> bool;
    // Idempotent: returns true only when a new row was inserted.
    async fn assign_plan(&self, assignment: PlanAssignment) -> bool;
    async fn is_plan_assigned(&self, plan_id: Uuid, client_id: Uuid) -> bool;

    // --- Exercises ---
    async fn get_exercises(&self, plan_id: Uuid) -> Vec<Exercise>;
    async fn add_exercise(&self, plan_id: Uuid, req: CreateExerciseRequest) -> Exercise;
    // Owner-scoped: the exercise's plan must belong to `trainer_id`.
    async fn update_exercise(
        &self,
        id: Uuid,
        trainer_id: Uuid,
        req: UpdateExerciseRequest,
    ) -> Option<Exercise>;
    async fn delete_exercise(&self, id: Uuid, trainer_id: Uuid) -> bool;
    /// Admin override: delete ANY exercise by id.
    async fn delete_exercise_admin(&self, id: Uuid) -> bool;

    // --- Dashboards ---
    async fn get_stats(&self) -> AdminDashboardStats;
    async fn get_trainer_stats(&self, trainer_id: Uuid) -> TrainerDashboardStats;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by
/// PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PLAN_COLUMNS: &str = "id, trainer_id, title, description, created_at, updated_at";

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> Option<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, role, first_name, last_name FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or(None)
    }

    async fn get_user_by_email(&self, email: &str) -> Option<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, role, first_name, last_name FROM profiles WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or(None)
    }

    /// Creates the mirroring profile record after the external auth provider
    /// has accepted the account.
    async fn create_user(&self, user: User) -> User {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO profiles (id, email, role, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, role, first_name, last_name
            "#,
        )
        .bind(user.id)
        .bind(user.email)
        .bind(user.role)
        .bind(user.first_name)
        .bind(user.last_name)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to create profile")
    }

    async fn list_users(&self, role: Option<Role>) -> Vec<User> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, role, first_name, last_name
            FROM profiles
            WHERE $1::text IS NULL OR role = $1
            ORDER BY last_name, first_name
            "#,
        )
        .bind(role.map(|r| r.as_str()))
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("list_users error: {:?}", e);
            vec![]
        })
    }

    async fn update_user_role(&self, id: Uuid, role: Role) -> Option<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE profiles SET role = $2 WHERE id = $1
            RETURNING id, email, role, first_name, last_name
            "#,
        )
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_user_role error: {:?}", e);
            None
        })
    }

    async fn delete_user(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_user error: {:?}", e);
                false
            }
        }
    }

    // --- INVITATIONS ---

    async fn create_invitation(&self, invitation: Invitation) -> Invitation {
        sqlx::query_as::<_, Invitation>(
            r#"
            INSERT INTO invitations (id, email, role, first_name, last_name, invited_by, accepted, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, false, NOW())
            RETURNING id, email, role, first_name, last_name, invited_by, accepted, created_at
            "#,
        )
        .bind(invitation.id)
        .bind(invitation.email)
        .bind(invitation.role)
        .bind(invitation.first_name)
        .bind(invitation.last_name)
        .bind(invitation.invited_by)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to create invitation")
    }

    async fn get_invitation(&self, id: Uuid) -> Option<Invitation> {
        sqlx::query_as::<_, Invitation>(
            r#"
            SELECT id, email, role, first_name, last_name, invited_by, accepted, created_at
            FROM invitations WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or(None)
    }

    async fn mark_invitation_accepted(&self, id: Uuid) -> bool {
        match sqlx::query("UPDATE invitations SET accepted = true WHERE id = $1 AND accepted = false")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("mark_invitation_accepted error: {:?}", e);
                false
            }
        }
    }

    // --- TRAINING PLANS ---

    /// Administrative listing. No trainer or assignment restriction.
    async fn list_all_plans(&self) -> Vec<TrainingPlan> {
        sqlx::query_as::<_, TrainingPlan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM training_plans ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("list_all_plans error: {:?}", e);
            vec![]
        })
    }

    async fn list_plans_for_trainer(&self, trainer_id: Uuid) -> Vec<TrainingPlan> {
        sqlx::query_as::<_, TrainingPlan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM training_plans WHERE trainer_id = $1 ORDER BY created_at DESC"
        ))
        .bind(trainer_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("list_plans_for_trainer error: {:?}", e);
            vec![]
        })
    }

    async fn list_plans_assigned_to(&self, client_id: Uuid) -> Vec<TrainingPlan> {
        sqlx::query_as::<_, TrainingPlan>(
            r#"
            SELECT p.id, p.trainer_id, p.title, p.description, p.created_at, p.updated_at
            FROM training_plans p
            JOIN plan_assignments a ON a.plan_id = p.id
            WHERE a.client_id = $1
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("list_plans_assigned_to error: {:?}", e);
            vec![]
        })
    }

    async fn get_plan(&self, id: Uuid) -> Option<TrainingPlan> {
        sqlx::query_as::<_, TrainingPlan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM training_plans WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_plan error: {:?}", e);
            None
        })
    }

    async fn create_plan(&self, req: CreatePlanRequest, trainer_id: Uuid) -> TrainingPlan {
        let new_id = Uuid::new_v4();
        sqlx::query_as::<_, TrainingPlan>(&format!(
            r#"
            INSERT INTO training_plans (id, trainer_id, title, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING {PLAN_COLUMNS}
            "#
        ))
        .bind(new_id)
        .bind(trainer_id)
        .bind(req.title)
        .bind(req.description)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to insert plan")
    }

    /// Updates a plan only when `trainer_id` matches the owner. COALESCE
    /// keeps columns whose payload field was absent.
    async fn update_plan(
        &self,
        id: Uuid,
        trainer_id: Uuid,
        req: UpdatePlanRequest,
    ) -> Option<TrainingPlan> {
        sqlx::query_as::<_, TrainingPlan>(&format!(
            r#"
            UPDATE training_plans
            SET title = COALESCE($3, title),
                description = COALESCE($4, description),
                updated_at = NOW()
            WHERE id = $1 AND trainer_id = $2
            RETURNING {PLAN_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(trainer_id)
        .bind(req.title)
        .bind(req.description)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_plan error: {:?}", e);
            None
        })
    }

    async fn delete_plan(&self, id: Uuid, trainer_id: Uuid) -> bool {
        match sqlx::query("DELETE FROM training_plans WHERE id = $1 AND trainer_id = $2")
            .bind(id)
            .bind(trainer_id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_plan error: {:?}", e);
                false
            }
        }
    }

    async fn delete_plan_admin(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM training_plans WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_plan_admin error: {:?}", e);
                false
            }
        }
    }

    /// Inserts an assignment. `ON CONFLICT DO NOTHING` on the composite key
    /// makes re-assignment a no-op; true only when a new row landed.
    async fn assign_plan(&self, assignment: PlanAssignment) -> bool {
        let result = sqlx::query(
            r#"
            INSERT INTO plan_assignments (plan_id, client_id, assigned_by, assigned_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(assignment.plan_id)
        .bind(assignment.client_id)
        .bind(assignment.assigned_by)
        .execute(&self.pool)
        .await;
        match result {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                // A duplicate does not error; only database failures land here.
                tracing::error!("assign_plan error: {:?}", e);
                false
            }
        }
    }

    async fn is_plan_assigned(&self, plan_id: Uuid, client_id: Uuid) -> bool {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM plan_assignments WHERE plan_id = $1 AND client_id = $2",
        )
        .bind(plan_id)
        .bind(client_id)
        .fetch_one(&self.pool)
        .await
        .unwrap_or(0)
            > 0
    }

    // --- EXERCISES ---

    async fn get_exercises(&self, plan_id: Uuid) -> Vec<Exercise> {
        sqlx::query_as::<_, Exercise>(
            r#"
            SELECT id, plan_id, name, description, sets, reps, position
            FROM exercises WHERE plan_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(plan_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_exercises error: {:?}", e);
            vec![]
        })
    }

    async fn add_exercise(&self, plan_id: Uuid, req: CreateExerciseRequest) -> Exercise {
        let new_id = Uuid::new_v4();
        sqlx::query_as::<_, Exercise>(
            r#"
            INSERT INTO exercises (id, plan_id, name, description, sets, reps, position)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, plan_id, name, description, sets, reps, position
            "#,
        )
        .bind(new_id)
        .bind(plan_id)
        .bind(req.name)
        .bind(req.description)
        .bind(req.sets)
        .bind(req.reps)
        .bind(req.position)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to insert exercise")
    }

    /// Updates an exercise only when its plan belongs to `trainer_id`.
    async fn update_exercise(
        &self,
        id: Uuid,
        trainer_id: Uuid,
        req: UpdateExerciseRequest,
    ) -> Option<Exercise> {
        sqlx::query_as::<_, Exercise>(
            r#"
            UPDATE exercises
            SET name = COALESCE($3, name),
                description = COALESCE($4, description),
                sets = COALESCE($5, sets),
                reps = COALESCE($6, reps),
                position = COALESCE($7, position)
            WHERE id = $1
              AND plan_id IN (SELECT id FROM training_plans WHERE trainer_id = $2)
            RETURNING id, plan_id, name, description, sets, reps, position
            "#,
        )
        .bind(id)
        .bind(trainer_id)
        .bind(req.name)
        .bind(req.description)
        .bind(req.sets)
        .bind(req.reps)
        .bind(req.position)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_exercise error: {:?}", e);
            None
        })
    }

    async fn delete_exercise(&self, id: Uuid, trainer_id: Uuid) -> bool {
        match sqlx::query(
            r#"
            DELETE FROM exercises
            WHERE id = $1
              AND plan_id IN (SELECT id FROM training_plans WHERE trainer_id = $2)
            "#,
        )
        .bind(id)
        .bind(trainer_id)
        .execute(&self.pool)
        .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_exercise error: {:?}", e);
                false
            }
        }
    }

    async fn delete_exercise_admin(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM exercises WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_exercise_admin error: {:?}", e);
                false
            }
        }
    }

    // --- DASHBOARDS ---

    /// Compiles the administrative counters in one call.
    async fn get_stats(&self) -> AdminDashboardStats {
        let count = |sql: &'static str| {
            let pool = self.pool.clone();
            async move {
                sqlx::query_scalar::<_, i64>(sql)
                    .fetch_one(&pool)
                    .await
                    .unwrap_or(0)
            }
        };

        AdminDashboardStats {
            total_users: count("SELECT COUNT(*) FROM profiles").await,
            total_trainers: count("SELECT COUNT(*) FROM profiles WHERE role = 'trainer'").await,
            total_clients: count("SELECT COUNT(*) FROM profiles WHERE role = 'client'").await,
            total_plans: count("SELECT COUNT(*) FROM training_plans").await,
            pending_invitations: count("SELECT COUNT(*) FROM invitations WHERE accepted = false")
                .await,
        }
    }

    async fn get_trainer_stats(&self, trainer_id: Uuid) -> TrainerDashboardStats {
        let total_plans = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM training_plans WHERE trainer_id = $1",
        )
        .bind(trainer_id)
        .fetch_one(&self.pool)
        .await
        .unwrap_or(0);

        let assigned_clients = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(DISTINCT a.client_id)
            FROM plan_assignments a
            JOIN training_plans p ON p.id = a.plan_id
            WHERE p.trainer_id = $1
            "#,
        )
        .bind(trainer_id)
        .fetch_one(&self.pool)
        .await
        .unwrap_or(0);

        let total_exercises = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM exercises e
            JOIN training_plans p ON p.id = e.plan_id
            WHERE p.trainer_id = $1
            "#,
        )
        .bind(trainer_id)
        .fetch_one(&self.pool)
        .await
        .unwrap_or(0);

        TrainerDashboardStats {
            total_plans,
            assigned_clients,
            total_exercises,
        }
    }
}
