use db::DBService;
use services::services::task::TaskService;

pub mod error;
pub mod http;
pub mod middleware;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    db: DBService,
    task_service: TaskService,
}

impl AppState {
    pub fn new(db: DBService) -> Self {
        let task_service = TaskService::new(db.clone());
        Self { db, task_service }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn task_service(&self) -> &TaskService {
        &self.task_service
    }
}
