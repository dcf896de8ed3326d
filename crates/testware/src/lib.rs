pub mod memory;
pub mod setup;

use std::sync::Arc;

use common::Role;
use common::password::hash_password;
use common::settings::Settings;
use sqlx::PgPool;
use uuid::Uuid;

use data::user::{NewUser, User};
use repos::user::UserRepo;

pub use memory::MemoryAttendanceStore;
pub use setup::TestSetup;

pub const TEST_PASSWORD: &str = "correct horse battery staple";

/// Create a test user with a known password
pub async fn create_test_user(pool: &PgPool, username: &str, role: Role) -> User {
    let new_user = NewUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password: hash_password(TEST_PASSWORD).expect("Failed to hash password"),
        full_name: format!("Test {username}"),
        role,
    };

    UserRepo::create(pool, new_user)
        .await
        .expect("Failed to insert test user")
}

/// Create a test user with a random username
pub async fn create_random_test_user(pool: &PgPool) -> User {
    let username = format!("testuser_{}", Uuid::new_v4().simple());
    create_test_user(pool, &username, Role::User).await
}

pub fn create_settings() -> Arc<Settings> {
    let mut settings = Settings::default();

    settings.session.cookie_name = "attendance-test".to_string();
    settings.session.expiry_hours = 1;

    Arc::new(settings)
}
