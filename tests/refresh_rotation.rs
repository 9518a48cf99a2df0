// Refresh-token rotation through the public service API, over the in-memory store

use quest_api::auth::models::{LoginRequest, RegisterRequest};
use quest_api::auth::{AuthError, AuthService};
use quest_api::testing::{test_auth_config, test_auth_service, MemoryStore};
use std::sync::Arc;

async fn service_with_bob() -> (AuthService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let service = test_auth_service(store.clone(), &test_auth_config());
    service
        .register(RegisterRequest {
            username: "bob".to_string(),
            email: "b@x.com".to_string(),
            password: "secret123".to_string(),
        })
        .await
        .unwrap();
    (service, store)
}

async fn login_bob(service: &AuthService) -> String {
    service
        .login(
            LoginRequest {
                username: Some("bob".to_string()),
                email: None,
                password: "secret123".to_string(),
            },
            None,
        )
        .await
        .unwrap()
        .refresh_token
}

#[tokio::test]
async fn test_same_refresh_token_spent_twice_has_one_winner() {
    let (service, _) = service_with_bob().await;
    let token = login_bob(&service).await;

    let (first, second) = tokio::join!(
        service.refresh(Some(token.as_str())),
        service.refresh(Some(token.as_str())),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(AuthError::ReuseDetected))));
}

#[tokio::test]
async fn test_rotation_chain_keeps_one_session_per_device() {
    let (service, store) = service_with_bob().await;
    let laptop = login_bob(&service).await;
    let mut phone = login_bob(&service).await;

    for _ in 0..3 {
        phone = service.refresh(Some(phone.as_str())).await.unwrap().refresh_token;
        assert_eq!(store.sessions_of("bob").len(), 2);
    }

    // The laptop session was never touched by the phone's rotations
    let laptop_next = service.refresh(Some(laptop.as_str())).await.unwrap();
    assert_eq!(laptop_next.username, "bob");
    assert_eq!(store.sessions_of("bob").len(), 2);
}
