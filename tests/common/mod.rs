#![allow(dead_code)]

use async_trait::async_trait;
use fitness_portal::{
    AccessPolicy, AppState,
    access::UnmatchedApi,
    auth::Claims,
    config::AppConfig,
    mailer::{MailerState, MockMailer},
    models::{
        AdminDashboardStats, CreateExerciseRequest, CreatePlanRequest, Exercise, Invitation,
        PlanAssignment, Role, TrainerDashboardStats, TrainingPlan, UpdateExerciseRequest,
        UpdatePlanRequest, User,
    },
    repository::{Repository, RepositoryState},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::SystemTime,
};
use tokio::net::TcpListener;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "super-secure-test-secret-value-local";

// --- In-Memory Repository ---

/// Full in-memory implementation of the repository contract, so integration
/// tests exercise the real router, gate and handlers without a database.
#[derive(Default)]
pub struct MemoryRepo {
    users: Mutex<HashMap<Uuid, User>>,
    invitations: Mutex<HashMap<Uuid, Invitation>>,
    plans: Mutex<HashMap<Uuid, TrainingPlan>>,
    exercises: Mutex<HashMap<Uuid, Exercise>>,
    assignments: Mutex<Vec<PlanAssignment>>,
}

#[async_trait]
impl Repository for MemoryRepo {
    async fn get_user(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }

    async fn get_user_by_email(&self, email: &str) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned()
    }

    async fn create_user(&self, user: User) -> User {
        self.users.lock().unwrap().insert(user.id, user.clone());
        user
    }

    async fn list_users(&self, role: Option<Role>) -> Vec<User> {
        self.users
            .lock()
            .unwrap()
            .values()
            .filter(|u| role.is_none_or(|r| u.role == r.as_str()))
            .cloned()
            .collect()
    }

    async fn update_user_role(&self, id: Uuid, role: Role) -> Option<User> {
        let mut users = self.users.lock().unwrap();
        users.get_mut(&id).map(|u| {
            u.role = role.as_str().to_string();
            u.clone()
        })
    }

    async fn delete_user(&self, id: Uuid) -> bool {
        self.users.lock().unwrap().remove(&id).is_some()
    }

    async fn create_invitation(&self, invitation: Invitation) -> Invitation {
        self.invitations
            .lock()
            .unwrap()
            .insert(invitation.id, invitation.clone());
        invitation
    }

    async fn get_invitation(&self, id: Uuid) -> Option<Invitation> {
        self.invitations.lock().unwrap().get(&id).cloned()
    }

    async fn mark_invitation_accepted(&self, id: Uuid) -> bool {
        let mut invitations = self.invitations.lock().unwrap();
        match invitations.get_mut(&id) {
            Some(inv) if !inv.accepted => {
                inv.accepted = true;
                true
            }
            _ => false,
        }
    }

    async fn list_all_plans(&self) -> Vec<TrainingPlan> {
        self.plans.lock().unwrap().values().cloned().collect()
    }

    async fn list_plans_for_trainer(&self, trainer_id: Uuid) -> Vec<TrainingPlan> {
        self.plans
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.trainer_id == trainer_id)
            .cloned()
            .collect()
    }

    async fn list_plans_assigned_to(&self, client_id: Uuid) -> Vec<TrainingPlan> {
        let assignments = self.assignments.lock().unwrap();
        let plans = self.plans.lock().unwrap();
        assignments
            .iter()
            .filter(|a| a.client_id == client_id)
            .filter_map(|a| plans.get(&a.plan_id).cloned())
            .collect()
    }

    async fn get_plan(&self, id: Uuid) -> Option<TrainingPlan> {
        self.plans.lock().unwrap().get(&id).cloned()
    }

    async fn create_plan(&self, req: CreatePlanRequest, trainer_id: Uuid) -> TrainingPlan {
        let now = chrono::Utc::now();
        let plan = TrainingPlan {
            id: Uuid::new_v4(),
            trainer_id,
            title: req.title,
            description: req.description,
            created_at: now,
            updated_at: now,
        };
        self.plans.lock().unwrap().insert(plan.id, plan.clone());
        plan
    }

    async fn update_plan(
        &self,
        id: Uuid,
        trainer_id: Uuid,
        req: UpdatePlanRequest,
    ) -> Option<TrainingPlan> {
        let mut plans = self.plans.lock().unwrap();
        match plans.get_mut(&id) {
            Some(plan) if plan.trainer_id == trainer_id => {
                if let Some(title) = req.title {
                    plan.title = title;
                }
                if let Some(description) = req.description {
                    plan.description = description;
                }
                plan.updated_at = chrono::Utc::now();
                Some(plan.clone())
            }
            _ => None,
        }
    }

    async fn delete_plan(&self, id: Uuid, trainer_id: Uuid) -> bool {
        let mut plans = self.plans.lock().unwrap();
        match plans.get(&id) {
            Some(plan) if plan.trainer_id == trainer_id => {
                plans.remove(&id);
                true
            }
            _ => false,
        }
    }

    async fn delete_plan_admin(&self, id: Uuid) -> bool {
        self.plans.lock().unwrap().remove(&id).is_some()
    }

    async fn assign_plan(&self, assignment: PlanAssignment) -> bool {
        let mut assignments = self.assignments.lock().unwrap();
        let duplicate = assignments
            .iter()
            .any(|a| a.plan_id == assignment.plan_id && a.client_id == assignment.client_id);
        if duplicate {
            return false;
        }
        assignments.push(assignment);
        true
    }

    async fn is_plan_assigned(&self, plan_id: Uuid, client_id: Uuid) -> bool {
        self.assignments
            .lock()
            .unwrap()
            .iter()
            .any(|a| a.plan_id == plan_id && a.client_id == client_id)
    }

    async fn get_exercises(&self, plan_id: Uuid) -> Vec<Exercise> {
        let mut exercises: Vec<Exercise> = self
            .exercises
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.plan_id == plan_id)
            .cloned()
            .collect();
        exercises.sort_by_key(|e| e.position);
        exercises
    }

    async fn add_exercise(&self, plan_id: Uuid, req: CreateExerciseRequest) -> Exercise {
        let exercise = Exercise {
            id: Uuid::new_v4(),
            plan_id,
            name: req.name,
            description: req.description,
            sets: req.sets,
            reps: req.reps,
            position: req.position,
        };
        self.exercises
            .lock()
            .unwrap()
            .insert(exercise.id, exercise.clone());
        exercise
    }

    async fn update_exercise(
        &self,
        id: Uuid,
        trainer_id: Uuid,
        req: UpdateExerciseRequest,
    ) -> Option<Exercise> {
        let plans = self.plans.lock().unwrap();
        let mut exercises = self.exercises.lock().unwrap();
        match exercises.get_mut(&id) {
            Some(exercise)
                if plans
                    .get(&exercise.plan_id)
                    .is_some_and(|p| p.trainer_id == trainer_id) =>
            {
                if let Some(name) = req.name {
                    exercise.name = name;
                }
                if let Some(description) = req.description {
                    exercise.description = description;
                }
                if let Some(sets) = req.sets {
                    exercise.sets = sets;
                }
                if let Some(reps) = req.reps {
                    exercise.reps = reps;
                }
                if let Some(position) = req.position {
                    exercise.position = position;
                }
                Some(exercise.clone())
            }
            _ => None,
        }
    }

    async fn delete_exercise(&self, id: Uuid, trainer_id: Uuid) -> bool {
        let plans = self.plans.lock().unwrap();
        let mut exercises = self.exercises.lock().unwrap();
        match exercises.get(&id) {
            Some(exercise)
                if plans
                    .get(&exercise.plan_id)
                    .is_some_and(|p| p.trainer_id == trainer_id) =>
            {
                exercises.remove(&id);
                true
            }
            _ => false,
        }
    }

    async fn delete_exercise_admin(&self, id: Uuid) -> bool {
        self.exercises.lock().unwrap().remove(&id).is_some()
    }

    async fn get_stats(&self) -> AdminDashboardStats {
        let users = self.users.lock().unwrap();
        AdminDashboardStats {
            total_users: users.len() as i64,
            total_trainers: users.values().filter(|u| u.role == "trainer").count() as i64,
            total_clients: users.values().filter(|u| u.role == "client").count() as i64,
            total_plans: self.plans.lock().unwrap().len() as i64,
            pending_invitations: self
                .invitations
                .lock()
                .unwrap()
                .values()
                .filter(|i| !i.accepted)
                .count() as i64,
        }
    }

    async fn get_trainer_stats(&self, trainer_id: Uuid) -> TrainerDashboardStats {
        let plans = self.plans.lock().unwrap();
        let own: Vec<Uuid> = plans
            .values()
            .filter(|p| p.trainer_id == trainer_id)
            .map(|p| p.id)
            .collect();

        let mut clients: Vec<Uuid> = self
            .assignments
            .lock()
            .unwrap()
            .iter()
            .filter(|a| own.contains(&a.plan_id))
            .map(|a| a.client_id)
            .collect();
        clients.sort();
        clients.dedup();

        let total_exercises = self
            .exercises
            .lock()
            .unwrap()
            .values()
            .filter(|e| own.contains(&e.plan_id))
            .count() as i64;

        TrainerDashboardStats {
            total_plans: own.len() as i64,
            assigned_clients: clients.len() as i64,
            total_exercises,
        }
    }
}

// --- Test Application Harness ---

pub struct TestApp {
    pub address: String,
    pub repo: Arc<MemoryRepo>,
    pub mailer: Arc<MockMailer>,
}

/// Builds the shared state over in-memory services. The default config keeps
/// `Env::Local`, so the `x-user-id` bypass is available to tests.
pub fn build_state(config: AppConfig) -> (AppState, Arc<MemoryRepo>, Arc<MockMailer>) {
    let repo = Arc::new(MemoryRepo::default());
    let mailer = Arc::new(MockMailer::new());
    let state = AppState {
        repo: repo.clone() as RepositoryState,
        mailer: mailer.clone() as MailerState,
        policy: Arc::new(AccessPolicy::standard(UnmatchedApi::Allow)),
        config,
    };
    (state, repo, mailer)
}

/// Spawns the real router on an ephemeral port.
pub async fn spawn_app() -> TestApp {
    let (state, repo, mailer) = build_state(AppConfig::default());
    let router = fitness_portal::create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        repo,
        mailer,
    }
}

/// A client that does not follow redirects, so tests can assert on the
/// redirect status and Location header the gate produced.
pub fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Mints a session token the resolver will accept, expiring `exp_offset`
/// seconds from now.
pub fn mint_token(user_id: Uuid, exp_offset: i64) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + exp_offset).max(0) as usize,
    };

    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

/// Seeds a profile with the given role and returns it.
pub async fn seed_user(repo: &Arc<MemoryRepo>, role: Role) -> User {
    let id = Uuid::new_v4();
    let user = User {
        id,
        email: format!("{}@example.test", id.simple()),
        role: role.as_str().to_string(),
        first_name: "Alex".to_string(),
        last_name: "Tester".to_string(),
    };
    repo.create_user(user.clone()).await
}
