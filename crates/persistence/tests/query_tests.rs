//! Relationship query integration tests.
//!
//! These tests exercise the read side of the dual-store design: union
//! and deduplication across sources, resolution through the primary
//! store, and degraded answers when the mirror cannot be read.

mod common;

use dossier_persistence::core::Filter;
use dossier_persistence::Collection;
use dossier_records::RecordId;

use common::{MedecinFixture, PatientFixture, TestEnv};

fn ids(patients: &[dossier_records::Patient]) -> Vec<&str> {
    patients.iter().map(|p| p.id.as_str()).collect()
}

// ============================================================================
// Treated-Patients Union Tests
// ============================================================================

#[tokio::test]
async fn test_treated_patients_union_consultations_and_assignments() {
    let env = TestEnv::new();
    let (consulted_id, _) = env.seed_patient(PatientFixture::new("Ba", "Moussa")).await;
    let (assigned_id, _) = env
        .seed_patient(PatientFixture::new("Ndiaye", "Fatou").with_username("fndiaye"))
        .await;
    let (medecin_id, medecin) = env.seed_medecin(MedecinFixture::new("Diallo", "Awa")).await;

    // One patient is known through a consultation record, the other
    // only through an assignment edge.
    env.seed_consultation(&medecin, &consulted_id, "2024-01-10T09:00:00Z", "checkup")
        .await;
    env.service
        .assign_treating_physician(&env.admin, &assigned_id, &medecin_id)
        .await
        .unwrap();

    let patients = env
        .service
        .patients_treated_by(&medecin, &medecin_id)
        .await
        .unwrap();
    assert_eq!(patients.len(), 2);
    assert!(ids(&patients).contains(&consulted_id.as_str()));
    assert!(ids(&patients).contains(&assigned_id.as_str()));
}

#[tokio::test]
async fn test_patient_reached_both_ways_appears_once() {
    let env = TestEnv::new();
    let (patient_id, _) = env.seed_patient(PatientFixture::new("Ba", "Moussa")).await;
    let (medecin_id, medecin) = env.seed_medecin(MedecinFixture::new("Diallo", "Awa")).await;

    env.service
        .assign_treating_physician(&env.admin, &patient_id, &medecin_id)
        .await
        .unwrap();
    env.seed_consultation(&medecin, &patient_id, "2024-01-10T09:00:00Z", "checkup")
        .await;
    env.seed_consultation(&medecin, &patient_id, "2024-02-02T10:00:00Z", "follow-up")
        .await;

    let patients = env
        .service
        .patients_treated_by(&medecin, &medecin_id)
        .await
        .unwrap();
    assert_eq!(patients.len(), 1);
    assert_eq!(patients[0].id, patient_id);
}

#[tokio::test]
async fn test_identifiers_without_primary_records_are_skipped() {
    let env = TestEnv::new();
    let (patient_id, _) = env.seed_patient(PatientFixture::new("Ba", "Moussa")).await;
    let (medecin_id, medecin) = env.seed_medecin(MedecinFixture::new("Diallo", "Awa")).await;

    env.service
        .assign_treating_physician(&env.admin, &patient_id, &medecin_id)
        .await
        .unwrap();
    env.seed_consultation(&medecin, &patient_id, "2024-01-10T09:00:00Z", "checkup")
        .await;

    // Remove the patient record behind the mirror's back; the edge and
    // the consultation still name the identifier.
    env.context
        .documents()
        .delete_one(Collection::Patients, &Filter::by_id(&patient_id))
        .await
        .unwrap();

    let patients = env
        .service
        .patients_treated_by(&medecin, &medecin_id)
        .await
        .unwrap();
    assert!(patients.is_empty(), "a dangling identifier is skipped, not an error");
}

#[tokio::test]
async fn test_mirror_read_failure_degrades_to_consultations() {
    let (env, flaky) = TestEnv::flaky();
    let (consulted_id, _) = env.seed_patient(PatientFixture::new("Ba", "Moussa")).await;
    let (assigned_id, _) = env
        .seed_patient(PatientFixture::new("Ndiaye", "Fatou").with_username("fndiaye"))
        .await;
    let (medecin_id, medecin) = env.seed_medecin(MedecinFixture::new("Diallo", "Awa")).await;

    env.seed_consultation(&medecin, &consulted_id, "2024-01-10T09:00:00Z", "checkup")
        .await;
    env.service
        .assign_treating_physician(&env.admin, &assigned_id, &medecin_id)
        .await
        .unwrap();

    // With the mirror unreadable, only the consultation-derived patient
    // is returned; the query itself still succeeds.
    flaky.fail_reads(true);
    let patients = env
        .service
        .patients_treated_by(&medecin, &medecin_id)
        .await
        .unwrap();
    assert_eq!(ids(&patients), vec![consulted_id.as_str()]);
}

#[tokio::test]
async fn test_treated_patients_empty_for_unconsulted_medecin() {
    let env = TestEnv::new();
    let (medecin_id, medecin) = env.seed_medecin(MedecinFixture::new("Diallo", "Awa")).await;

    let patients = env
        .service
        .patients_treated_by(&medecin, &medecin_id)
        .await
        .unwrap();
    assert!(patients.is_empty());
}

// ============================================================================
// Consultation View Tests
// ============================================================================

#[tokio::test]
async fn test_history_resolves_physician_names() {
    let env = TestEnv::new();
    let (patient_id, patient) = env.seed_patient(PatientFixture::new("Ba", "Moussa")).await;
    let (_, medecin) = env
        .seed_medecin(MedecinFixture::new("Diallo", "Awa").with_specialty("Cardiology"))
        .await;

    env.seed_consultation(&medecin, &patient_id, "2024-01-10T09:00:00Z", "checkup")
        .await;
    env.seed_consultation(&medecin, &patient_id, "2024-02-02T10:00:00Z", "follow-up")
        .await;

    let history = env
        .service
        .consultation_history(&patient, &patient_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    for view in &history {
        assert_eq!(view.counterpart_name.as_deref(), Some("Awa Diallo"));
        assert_eq!(view.consultation.patient_id, patient_id);
    }
}

#[tokio::test]
async fn test_history_tolerates_a_deleted_physician() {
    let env = TestEnv::new();
    let (patient_id, patient) = env.seed_patient(PatientFixture::new("Ba", "Moussa")).await;
    let (medecin_id, medecin) = env.seed_medecin(MedecinFixture::new("Diallo", "Awa")).await;

    env.seed_consultation(&medecin, &patient_id, "2024-01-10T09:00:00Z", "checkup")
        .await;
    env.service
        .delete_medecin(&env.admin, &medecin_id)
        .await
        .unwrap();

    let history = env
        .service
        .consultation_history(&patient, &patient_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].consultation.reason, "checkup");
    assert_eq!(history[0].counterpart_name, None);
}

#[tokio::test]
async fn test_consultations_for_medecin_resolve_patient_names() {
    let env = TestEnv::new();
    let (first_id, _) = env.seed_patient(PatientFixture::new("Ba", "Moussa")).await;
    let (second_id, _) = env
        .seed_patient(PatientFixture::new("Ndiaye", "Fatou").with_username("fndiaye"))
        .await;
    let (medecin_id, medecin) = env.seed_medecin(MedecinFixture::new("Diallo", "Awa")).await;

    env.seed_consultation(&medecin, &first_id, "2024-01-10T09:00:00Z", "checkup")
        .await;
    env.seed_consultation(&medecin, &second_id, "2024-01-11T09:00:00Z", "vaccination")
        .await;

    let views = env
        .service
        .consultations_for_medecin(&medecin, &medecin_id)
        .await
        .unwrap();
    assert_eq!(views.len(), 2);

    let names: Vec<_> = views
        .iter()
        .filter_map(|v| v.counterpart_name.as_deref())
        .collect();
    assert!(names.contains(&"Moussa Ba"));
    assert!(names.contains(&"Fatou Ndiaye"));
}

#[tokio::test]
async fn test_history_is_empty_for_unknown_patient() {
    let env = TestEnv::new();
    let unknown = RecordId::new("no-such-patient");

    let history = env
        .service
        .consultation_history(&env.admin, &unknown)
        .await
        .unwrap();
    assert!(history.is_empty());
}
