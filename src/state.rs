use std::sync::Arc;
use tracing::info;

use crate::{
    repo::{
        admin_users::JsonAdminUsersRepo, phone_numbers::JsonPhoneNumbersRepo,
        submissions::JsonSubmissionsRepo,
    },
    service::{
        admins::{AdminsService, AdminsServiceImpl},
        config::ConfigService,
        events::SubmissionEvents,
        phone_numbers::{PhoneNumbersService, PhoneNumbersServiceImpl},
        session::{MemorySessionService, RedisSessionService, SessionError, SessionService},
        submissions::{SubmissionsService, SubmissionsServiceImpl},
    },
    store::LockRegistry,
};

pub struct AppState {
    config: Arc<dyn ConfigService>,
    submissions: Arc<dyn SubmissionsService>,
    admins: Arc<dyn AdminsService>,
    phone_numbers: Arc<dyn PhoneNumbersService>,
}

impl AppState {
    pub async fn new(config: Arc<dyn ConfigService>) -> Result<Arc<Self>, SessionError> {
        let values = config.values();
        let data_dir = values.data_dir.as_path();

        // One registry for every store in the process.
        let locks = LockRegistry::new();
        let submissions_repo = Arc::new(JsonSubmissionsRepo::new(&locks, data_dir));
        let admins_repo = Arc::new(JsonAdminUsersRepo::new(&locks, data_dir));
        let phone_numbers_repo = Arc::new(JsonPhoneNumbersRepo::new(&locks, data_dir));

        let sessions: Arc<dyn SessionService> = match &values.redis_url {
            Some(redis_url) => {
                info!("using redis session store");
                Arc::new(
                    RedisSessionService::new(
                        redis_url,
                        values.session_ttl_seconds,
                        values.session_key_prefix.clone(),
                    )
                    .await?,
                )
            }
            None => {
                info!("REDIS_URL not set, keeping sessions in memory");
                Arc::new(MemorySessionService::new(values.session_ttl_seconds))
            }
        };

        let submissions = Arc::new(SubmissionsServiceImpl::new(
            submissions_repo,
            phone_numbers_repo.clone(),
            Arc::new(SubmissionEvents::new()),
        ));
        let admins = Arc::new(AdminsServiceImpl::new(admins_repo, sessions));
        let phone_numbers = Arc::new(PhoneNumbersServiceImpl::new(phone_numbers_repo));

        Ok(Arc::new(Self {
            config,
            submissions,
            admins,
            phone_numbers,
        }))
    }

    pub fn config(&self) -> &dyn ConfigService {
        self.config.as_ref()
    }

    pub fn submissions(&self) -> &dyn SubmissionsService {
        self.submissions.as_ref()
    }

    pub fn admins(&self) -> &dyn AdminsService {
        self.admins.as_ref()
    }

    pub fn phone_numbers(&self) -> &dyn PhoneNumbersService {
        self.phone_numbers.as_ref()
    }
}
