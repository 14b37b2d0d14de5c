use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::*;

fn counting_task(counter: &Arc<AtomicUsize>) -> Task {
    let counter = Arc::clone(counter);
    Task::with_body(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn new_task_is_ready_without_dependencies() {
    let task = Task::new();
    assert_eq!(task.state(), TaskState::Ready);
    assert!(task.is_ready());
    assert!(!task.is_executing());
    assert!(!task.is_finished());
    assert!(!task.is_cancelled());
    assert!(task.outcome().is_none());
    assert_eq!(task.priority(), Priority::Normal);
}

#[test]
fn start_runs_body_once() {
    let counter = Arc::new(AtomicUsize::new(0));
    let task = counting_task(&counter);

    task.start().unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(task.state(), TaskState::Finished);
    assert_eq!(task.outcome(), Some(TaskOutcome::Completed));
    assert_eq!(task.start(), Err(TaskError::AlreadyStarted(task.id())));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn empty_task_finishes_immediately() {
    let task = Task::new();
    task.start().unwrap();
    assert!(task.is_finished());
    assert_eq!(task.outcome(), Some(TaskOutcome::Completed));
}

#[test]
fn set_body_replaces_work() {
    let hits = Arc::new(Mutex::new(Vec::new()));
    let h = Arc::clone(&hits);
    let task = Task::with_body(|| panic!("replaced body must not run"));
    task.set_body(move || h.lock().unwrap().push("replacement")).unwrap();

    task.start().unwrap();
    assert_eq!(*hits.lock().unwrap(), vec!["replacement"]);
    assert!(task.set_body(|| {}).is_err());
}

#[test]
fn cancelled_before_start_skips_body() {
    let counter = Arc::new(AtomicUsize::new(0));
    let task = counting_task(&counter);

    task.cancel();
    task.cancel();
    assert!(task.is_cancelled());
    assert!(task.is_ready());

    task.start().unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert_eq!(task.outcome(), Some(TaskOutcome::Cancelled));
    assert!(task.is_finished());
}

#[test]
fn cancel_after_finish_is_ignored() {
    let task = Task::new();
    task.start().unwrap();
    task.cancel();
    assert!(!task.is_cancelled());
    assert_eq!(task.outcome(), Some(TaskOutcome::Completed));
}

#[test]
fn panicking_body_is_recorded() {
    let task = Task::with_body(|| panic!("kaboom"));
    task.start().unwrap();
    assert_eq!(task.outcome(), Some(TaskOutcome::Panicked("kaboom".into())));
    assert!(task.is_finished());
}

#[test]
fn dependency_blocks_readiness() {
    let first = Task::new();
    let second = Task::new();
    second.add_dependency(&first).unwrap();

    assert_eq!(second.state(), TaskState::Initial);
    assert_eq!(second.pending_dependency_count(), 1);
    assert_eq!(second.dependencies(), vec![first.clone()]);

    first.start().unwrap();
    assert_eq!(second.state(), TaskState::Ready);
    assert_eq!(second.pending_dependency_count(), 0);
    // The edge stays in place after the dependency finished.
    assert_eq!(second.dependencies().len(), 1);
}

#[test]
fn duplicate_dependency_is_ignored() {
    let first = Task::new();
    let second = Task::new();
    second.add_dependency(&first).unwrap();
    second.add_dependency(&first).unwrap();
    assert_eq!(second.dependencies().len(), 1);
    assert_eq!(second.pending_dependency_count(), 1);
}

#[test]
fn dependency_on_finished_task_is_satisfied() {
    let first = Task::new();
    first.start().unwrap();

    let second = Task::new();
    second.add_dependency(&first).unwrap();
    assert!(second.is_ready());
    assert_eq!(second.dependencies().len(), 1);
}

#[test]
fn self_dependency_is_rejected() {
    let task = Task::new();
    assert_eq!(
        task.add_dependency(&task),
        Err(TaskError::SelfDependency(task.id()))
    );
}

#[test]
fn cycles_are_rejected() {
    let a = Task::new();
    let b = Task::new();
    let c = Task::new();
    b.add_dependency(&a).unwrap();
    c.add_dependency(&b).unwrap();

    let err = a.add_dependency(&c).unwrap_err();
    assert_eq!(
        err,
        TaskError::DependencyCycle {
            task: a.id(),
            dependency: c.id()
        }
    );
    assert!(a.dependencies().is_empty());
}

#[test]
fn remove_last_dependency_makes_ready() {
    let first = Task::new();
    let second = Task::new();
    second.add_dependency(&first).unwrap();
    assert!(!second.is_ready());

    second.remove_dependency(&first).unwrap();
    assert!(second.is_ready());
    assert!(second.dependencies().is_empty());

    // Finishing the former dependency must not disturb the count.
    first.start().unwrap();
    assert_eq!(second.pending_dependency_count(), 0);

    second.remove_dependency(&first).unwrap();
}

#[test]
fn dependency_changes_after_start_fail() {
    let first = Task::new();
    let second = Task::new();
    second.start().unwrap();
    assert_eq!(
        second.add_dependency(&first),
        Err(TaskError::AlreadyStarted(second.id()))
    );
    assert_eq!(
        second.remove_dependency(&first),
        Err(TaskError::AlreadyStarted(second.id()))
    );
}

#[test]
fn start_waits_for_dependency() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let o1 = Arc::clone(&order);
    let o2 = Arc::clone(&order);
    let first = Task::with_body(move || o1.lock().unwrap().push(1));
    let second = Task::with_body(move || o2.lock().unwrap().push(2));
    second.add_dependency(&first).unwrap();

    let waiter = {
        let second = second.clone();
        thread::spawn(move || second.start())
    };
    thread::sleep(Duration::from_millis(20));
    assert!(!second.is_finished());

    first.start().unwrap();
    waiter.join().unwrap().unwrap();
    assert_eq!(*order.lock().unwrap(), vec![1, 2]);
}

#[test]
fn cancel_releases_blocked_start() {
    let counter = Arc::new(AtomicUsize::new(0));
    let blocker = Task::new();
    let task = counting_task(&counter);
    task.add_dependency(&blocker).unwrap();

    let waiter = {
        let task = task.clone();
        thread::spawn(move || task.start())
    };
    thread::sleep(Duration::from_millis(20));
    task.cancel();

    waiter.join().unwrap().unwrap();
    assert_eq!(task.outcome(), Some(TaskOutcome::Cancelled));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert!(!blocker.is_finished());
}

#[test]
fn cancelled_dependency_still_releases_dependent() {
    let first = Task::new();
    let second = Task::new();
    second.add_dependency(&first).unwrap();

    first.cancel();
    first.start().unwrap();

    assert!(!second.is_cancelled());
    assert!(second.is_ready());
}

#[test]
fn completion_runs_after_finish() {
    let (tx, rx) = mpsc::channel();
    let task = Task::with_body(|| {});
    task.set_completion(move || tx.send(()).unwrap()).unwrap();

    task.start().unwrap();
    rx.recv_timeout(Duration::from_secs(5))
        .expect("completion closure did not run");
    assert!(task.set_completion(|| {}).is_err());
}

#[test]
fn completion_runs_for_cancelled_task() {
    let (tx, rx) = mpsc::channel();
    let task = Task::with_body(|| {});
    task.set_completion(move || tx.send(()).unwrap()).unwrap();
    task.cancel();
    task.start().unwrap();
    rx.recv_timeout(Duration::from_secs(5))
        .expect("completion closure did not run");
}

#[test]
fn wait_until_finished_blocks_until_release() {
    let task = Task::with_body(|| thread::sleep(Duration::from_millis(30)));
    assert!(!task.wait_until_finished_timeout(Duration::from_millis(5)));

    let runner = {
        let task = task.clone();
        thread::spawn(move || task.start())
    };
    task.wait_until_finished();
    assert!(task.is_finished());
    assert!(task.wait_until_finished_timeout(Duration::from_millis(1)));
    runner.join().unwrap().unwrap();
}

#[test]
fn weak_task_observes_cancellation() {
    let task = Task::new();
    let weak = task.downgrade();
    assert!(!weak.is_cancelled());
    task.cancel();
    assert!(weak.is_cancelled());
    drop(task);
    assert!(weak.upgrade().is_none());
    assert!(!weak.is_cancelled());
}

#[test]
fn group_runs_blocks_in_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let o = Arc::clone(&order);
    let group = TaskGroup::new(move || o.lock().unwrap().push("primary"));
    for label in ["second", "third"] {
        let o = Arc::clone(&order);
        group
            .add_execution_block(move || o.lock().unwrap().push(label))
            .unwrap();
    }
    assert_eq!(group.execution_block_count(), 3);

    group.start().unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["primary", "second", "third"]);
    assert_eq!(group.execution_block_count(), 0);
    assert!(group.add_execution_block(|| {}).is_err());
}

#[test]
fn group_set_body_replaces_primary_only() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let group = TaskGroup::new(|| panic!("primary was replaced"));
    let o = Arc::clone(&order);
    group.add_execution_block(move || o.lock().unwrap().push("extra")).unwrap();
    let o = Arc::clone(&order);
    group.set_body(move || o.lock().unwrap().push("new primary")).unwrap();

    let task: Task = group.into();
    task.start().unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["new primary", "extra"]);
}

#[test]
fn group_panic_skips_remaining_blocks() {
    let counter = Arc::new(AtomicUsize::new(0));
    let group = TaskGroup::new(|| panic!("first block failed"));
    let c = Arc::clone(&counter);
    group
        .add_execution_block(move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    group.start().unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert!(matches!(group.outcome(), Some(TaskOutcome::Panicked(_))));
}

#[test]
fn handles_compare_by_identity() {
    let a = Task::new();
    let b = Task::new();
    assert_eq!(a, a.clone());
    assert_ne!(a, b);

    let set: std::collections::HashSet<Task> = [a.clone(), a.clone(), b].into_iter().collect();
    assert_eq!(set.len(), 2);
}
