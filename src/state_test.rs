use super::*;
use super::test_helpers::{MockVerifier, test_app_state, test_app_state_with_verifier};
use crate::identity::AuthError;

#[test]
fn state_holds_shared_config() {
    let state = AppState::new(AppConfig::default(), None);
    let clone = state.clone();
    assert!(Arc::ptr_eq(&state.config, &clone.config));
}

#[test]
fn default_state_runs_without_verifier() {
    assert!(test_app_state().verifier.is_none());
}

#[tokio::test]
async fn clones_share_the_verifier() {
    let state = test_app_state_with_verifier(MockVerifier::default().with_token("t", "u1"));
    let clone = state.clone();
    let verifier = clone.verifier.as_ref().unwrap();
    assert!(Arc::ptr_eq(state.verifier.as_ref().unwrap(), verifier));
    assert_eq!(verifier.verify("t").await.unwrap(), "u1");
    assert!(matches!(verifier.verify("other").await, Err(AuthError::InvalidToken)));
}
