//! Token resolution integration tests.
//!
//! These tests resolve opaque tokens against records created through
//! the service, covering the collection probe order and the outcomes
//! for unknown, malformed, and deleted principals.

mod common;

use serde_json::json;

use dossier_persistence::error::AuthError;
use dossier_persistence::Collection;
use dossier_records::{NewPrincipal, Role};

use common::{MedecinFixture, PatientFixture, TestEnv};

// ============================================================================
// Resolution Tests
// ============================================================================

#[tokio::test]
async fn test_registered_admin_principal_resolves() {
    let env = TestEnv::new();
    let receipt = env
        .service
        .register_principal(
            &env.admin,
            NewPrincipal {
                username: "root".to_string(),
                password: "s3cret".to_string(),
                role: Role::Admin,
                linked_id: None,
            },
        )
        .await
        .unwrap();

    let resolution = env.resolver().resolve(receipt.id.as_str()).await.unwrap();
    let principal = resolution.authenticated().unwrap();
    assert_eq!(principal.role, Role::Admin);

    // The resolved caller can drive administrator operations.
    let caller = principal.caller();
    let created = env
        .service
        .create_patient(&caller, PatientFixture::new("Ba", "Moussa").to_new())
        .await;
    assert!(created.is_ok());
}

#[tokio::test]
async fn test_entity_records_resolve_to_their_roles() {
    let env = TestEnv::new();
    let (patient_id, _) = env.seed_patient(PatientFixture::new("Ba", "Moussa")).await;
    let (medecin_id, _) = env.seed_medecin(MedecinFixture::new("Diallo", "Awa")).await;

    let resolution = env.resolver().resolve(patient_id.as_str()).await.unwrap();
    assert_eq!(resolution.authenticated().unwrap().role, Role::Patient);

    let resolution = env.resolver().resolve(medecin_id.as_str()).await.unwrap();
    assert_eq!(resolution.authenticated().unwrap().role, Role::Medecin);
}

#[tokio::test]
async fn test_admin_wins_on_identifier_collision() {
    let env = TestEnv::new();
    let documents = env.context.documents();

    // The same identifier exists in two collections; the principal
    // probe runs first, so the administrator identity wins.
    documents
        .insert(
            Collection::Principals,
            json!({
                "id": "dual-1",
                "username": "root",
                "password_hash": "$h",
                "role": "admin",
            }),
        )
        .await
        .unwrap();
    documents
        .insert(
            Collection::Medecins,
            json!({
                "id": "dual-1",
                "family_name": "Diallo",
                "given_name": "Awa",
                "specialty": "Cardiology",
                "username": "adiallo",
                "password_hash": "$h",
            }),
        )
        .await
        .unwrap();

    let resolution = env.resolver().resolve("dual-1").await.unwrap();
    assert_eq!(resolution.authenticated().unwrap().role, Role::Admin);
}

// ============================================================================
// Unauthenticated Outcomes
// ============================================================================

#[tokio::test]
async fn test_unknown_token_is_unauthenticated() {
    let env = TestEnv::new();
    let resolution = env
        .resolver()
        .resolve("662f9a1c8dd14a0f5b3c7e21")
        .await
        .unwrap();
    assert!(!resolution.is_authenticated());

    let err = resolution.authenticated().unwrap_err();
    assert!(matches!(err, AuthError::Unauthenticated));
}

#[tokio::test]
async fn test_malformed_token_is_an_outcome_not_an_error() {
    let env = TestEnv::new();
    for token in ["", "has space", "MATCH (n) DETACH DELETE n", "x;y"] {
        let resolution = env.resolver().resolve(token).await.unwrap();
        assert!(
            !resolution.is_authenticated(),
            "token {token:?} must not authenticate"
        );
    }
}

#[tokio::test]
async fn test_deleted_principal_no_longer_resolves() {
    let env = TestEnv::new();
    let receipt = env
        .service
        .register_principal(
            &env.admin,
            NewPrincipal {
                username: "root".to_string(),
                password: "s3cret".to_string(),
                role: Role::Admin,
                linked_id: None,
            },
        )
        .await
        .unwrap();
    assert!(
        env.resolver()
            .resolve(receipt.id.as_str())
            .await
            .unwrap()
            .is_authenticated()
    );

    env.service
        .delete_principal(&env.admin, &receipt.id)
        .await
        .unwrap();
    let resolution = env.resolver().resolve(receipt.id.as_str()).await.unwrap();
    assert!(!resolution.is_authenticated());
}

#[tokio::test]
async fn test_non_admin_principal_record_is_not_a_login_token() {
    let env = TestEnv::new();
    let (medecin_id, _) = env.seed_medecin(MedecinFixture::new("Diallo", "Awa")).await;

    // A physician-role principal record exists for the graph link, but
    // its own identifier does not resolve; physicians authenticate by
    // their entity record.
    let receipt = env
        .service
        .register_principal(
            &env.admin,
            NewPrincipal {
                username: "adiallo.login".to_string(),
                password: "s3cret".to_string(),
                role: Role::Medecin,
                linked_id: Some(medecin_id),
            },
        )
        .await
        .unwrap();

    let resolution = env.resolver().resolve(receipt.id.as_str()).await.unwrap();
    assert!(!resolution.is_authenticated());
}
