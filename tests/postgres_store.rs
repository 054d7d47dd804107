//! Exercises `PgUserStore` against a live database.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -- --ignored`.

use chrono::{Duration, Utc};

use authgate::{
    db,
    error::AppError,
    models::user::{NewUser, PasswordReset, Role},
    repositories::user::{PgUserStore, SaveMode, UserStore, DUPLICATE_EMAIL},
};

async fn store() -> PgUserStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = db::create_pool(&url).unwrap();
    db::ensure_schema(&pool).await.unwrap();
    PgUserStore::new(pool)
}

fn unique_email() -> String {
    format!("pg_{}@example.com", uuid::Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore]
async fn test_pg_user_lifecycle() {
    let store = store().await;
    let email = unique_email();

    let mut user = store
        .create(NewUser {
            name: "Pg User".to_string(),
            email: email.clone(),
            password_hash: "$argon2id$placeholder".to_string(),
            role: Role::LeadGuide,
        })
        .await
        .unwrap();
    assert_eq!(user.role, Role::LeadGuide);
    assert!(user.active);

    let err = store
        .create(NewUser {
            name: "Copy".to_string(),
            email: email.clone(),
            password_hash: "$argon2id$placeholder".to_string(),
            role: Role::User,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ref m) if m == DUPLICATE_EMAIL));

    user.password_reset = Some(PasswordReset {
        token_hash: format!("digest-{}", user.id),
        expires_at: Utc::now() + Duration::minutes(10),
    });
    store.save(&user, SaveMode::SkipValidation).await.unwrap();

    let found = store
        .find_by_reset_token(&format!("digest-{}", user.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, user.id);
    assert!(found.password_reset.is_some());

    user.clear_password_reset();
    user.active = false;
    store.save(&user, SaveMode::Validate).await.unwrap();

    assert!(store.find_by_id(user.id).await.unwrap().is_none());
    assert!(store.find_by_email(&email).await.unwrap().is_none());
}
