//! Tests for bounded admission.

use super::support::{ScriptedTask, scripted_recorder};
use kodegen_pipeline::{CAPACITY, Pipeline, PipelineError};

fn fill(pipeline: &Pipeline<ScriptedTask>) -> Vec<ScriptedTask> {
    (0..CAPACITY as u32)
        .map(|id| {
            let task = ScriptedTask::new(id);
            pipeline.admit(task.clone()).unwrap();
            task
        })
        .collect()
}

#[test]
fn test_capacity_is_ten() {
    let (pipeline, _delivered) = scripted_recorder();
    assert_eq!(CAPACITY, 10);
    assert_eq!(pipeline.capacity(), CAPACITY);
}

#[test]
fn test_eleventh_admission_is_rejected() {
    let (pipeline, delivered) = scripted_recorder();
    let tasks = fill(&pipeline);
    assert!(pipeline.is_full());

    let extra = ScriptedTask::new(99);
    let err = pipeline.admit(extra.clone()).unwrap_err();
    assert!(matches!(err, PipelineError::Capacity { capacity: 10 }));
    assert!(!err.is_retryable());
    assert_eq!(extra.listeners(), 0);
    assert_eq!(pipeline.len(), CAPACITY);
    assert_eq!((pipeline.head(), pipeline.tail()), (0, CAPACITY));

    for task in &tasks {
        task.resolve_and_fire().unwrap();
    }
    let expected: Vec<u32> = (0..CAPACITY as u32).collect();
    assert_eq!(*delivered.borrow(), expected);
    assert!(pipeline.is_empty());
}

#[test]
fn test_delivery_of_head_frees_a_slot() {
    let (pipeline, delivered) = scripted_recorder();
    let tasks = fill(&pipeline);
    assert!(pipeline.admit(ScriptedTask::new(99)).is_err());

    tasks[0].resolve_and_fire().unwrap();
    assert_eq!(*delivered.borrow(), [0]);
    assert!(!pipeline.is_full());

    let late = ScriptedTask::new(10);
    pipeline.admit(late.clone()).unwrap();
    assert!(pipeline.is_full());
    assert_eq!(late.listeners(), 1);
}

#[test]
fn test_finished_task_behind_pending_head_keeps_its_slot() {
    let (pipeline, delivered) = scripted_recorder();
    let tasks = fill(&pipeline);

    tasks[5].resolve_and_fire().unwrap();
    assert!(delivered.borrow().is_empty());
    assert!(matches!(
        pipeline.admit(ScriptedTask::new(99)),
        Err(PipelineError::Capacity { .. })
    ));
}

#[test]
fn test_indices_reset_once_drained() {
    let (pipeline, _delivered) = scripted_recorder();
    for id in 0..3 {
        let task = ScriptedTask::new(id);
        pipeline.admit(task.clone()).unwrap();
        task.resolve_and_fire().unwrap();
    }
    assert!(pipeline.is_empty());
    assert_eq!((pipeline.head(), pipeline.tail()), (1, 1));

    pipeline.admit(ScriptedTask::new(3)).unwrap();
    assert_eq!((pipeline.head(), pipeline.tail()), (0, 1));
}

#[test]
fn test_capacity_error_message() {
    let err = PipelineError::Capacity { capacity: CAPACITY };
    assert_eq!(err.to_string(), "Pipeline is full: 10 tasks outstanding");
}
