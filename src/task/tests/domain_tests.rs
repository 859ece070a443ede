//! Tests for task construction and outcome accessors.

use crate::provider::domain::ProviderId;
use crate::task::domain::{
    FailureReason, GenerationPayload, ReferencePayload, Task, TaskDomainError, TaskFailure,
    TaskId, TaskInput, TaskOutcome, truncate_for_log,
};
use rstest::rstest;

#[rstest]
fn task_keeps_caller_assigned_id() {
    let id = TaskId::new();
    let task = Task::with_id(id, TaskInput::from_prompt("a red fox at dawn")).expect("valid task");
    assert_eq!(task.id(), id);
    assert_eq!(task.input().prompt(), "a red fox at dawn");
}

#[rstest]
fn empty_prompt_without_reference_is_rejected() {
    let result = Task::new(TaskInput::from_prompt("   "));
    assert_eq!(result, Err(TaskDomainError::EmptyInput));
}

#[rstest]
fn reference_only_input_is_accepted() {
    let input = TaskInput::from_prompt("").with_reference(ReferencePayload::new("r2://ref.png"));
    let task = Task::new(input).expect("reference-only input is valid");
    assert!(task.input().has_reference());
}

#[rstest]
fn blank_reference_location_is_rejected() {
    let input = TaskInput::from_prompt("pose")
        .with_reference(ReferencePayload::new("r2://a.png"))
        .with_reference(ReferencePayload::new(" "));
    assert_eq!(
        Task::new(input),
        Err(TaskDomainError::EmptyReference { index: 1 })
    );
}

#[rstest]
#[case("short", 10, "short")]
#[case("exactly10!", 10, "exactly10!")]
#[case("longer than ten", 10, "longer tha…")]
#[case("éß漢字かな", 3, "éß漢…")]
fn truncate_for_log_respects_char_boundaries(
    #[case] text: &str,
    #[case] max: usize,
    #[case] expected: &str,
) {
    assert_eq!(truncate_for_log(text, max), expected);
}

#[rstest]
fn preview_truncates_long_prompts() {
    let prompt = "x".repeat(200);
    let input = TaskInput::from_prompt(prompt);
    assert_eq!(input.preview().chars().count(), 81);
}

#[rstest]
fn outcome_accessors_follow_result() {
    let task_id = TaskId::new();
    let provider = ProviderId::new("gemini-image").expect("valid provider id");
    let success = TaskOutcome::success(
        task_id,
        provider.clone(),
        GenerationPayload::from_url("https://cdn/x.png"),
    );
    assert!(success.is_success());
    assert_eq!(success.provider_used(), Some(&provider));
    assert!(success.failure_details().is_none());

    let failed = TaskOutcome::failure(
        task_id,
        None,
        TaskFailure::new(FailureReason::NoCapableProvider, "no provider", 0),
    );
    assert!(!failed.is_success());
    assert!(failed.payload().is_none());
    assert_eq!(
        failed.failure_details().map(|failure| failure.reason),
        Some(FailureReason::NoCapableProvider)
    );
}

#[rstest]
fn failure_message_is_truncated() {
    let failure = TaskFailure::new(FailureReason::NonRecoverable, &"e".repeat(400), 1);
    assert_eq!(failure.message.chars().count(), 151);
}
