#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::context::SchedulerContext;
    use crate::error::TaskError;
    use crate::queue::TaskQueue;
    use crate::task::{Task, TaskGroup};
    use crate::types::{Priority, QualityOfService, TaskOutcome};

    const WAIT: Duration = Duration::from_secs(10);

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> Task) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let l = Arc::clone(&log);
        let make = move |label: &'static str| {
            let l = Arc::clone(&l);
            let task = Task::with_body(move || l.lock().unwrap().push(label));
            task.set_name(label);
            task
        };
        (log, make)
    }

    #[test]
    fn queue_defaults() {
        let queue = TaskQueue::new();
        assert!(queue.name().starts_with("queue-"));
        assert_eq!(queue.max_concurrent_tasks(), None);
        assert!(!queue.is_suspended());
        assert_eq!(queue.operation_count(), 0);
        assert_eq!(queue.quality_of_service(), QualityOfService::Default);
        assert_ne!(TaskQueue::new().name(), queue.name());
    }

    #[test]
    fn settings_round_trip() {
        let queue = TaskQueue::named("ingest");
        queue.set_name("renamed");
        queue.set_quality_of_service(QualityOfService::Utility);
        queue.set_max_concurrent_tasks(Some(3)).unwrap();

        assert_eq!(queue.name(), "renamed");
        assert_eq!(queue.quality_of_service(), QualityOfService::Utility);
        assert_eq!(queue.max_concurrent_tasks(), Some(3));
        assert_eq!(
            queue.set_max_concurrent_tasks(Some(0)),
            Err(TaskError::InvalidConcurrency)
        );
        assert_eq!(queue.max_concurrent_tasks(), Some(3));
        assert_eq!(TaskQueue::serial("s").max_concurrent_tasks(), Some(1));
    }

    #[test]
    fn added_task_runs_and_leaves_queue() {
        let queue = TaskQueue::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let task = queue.add_task_with_body(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(task.owning_queue(), Some(queue.clone()));

        queue.wait_until_all_tasks_are_finished();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(task.is_finished());
        assert_eq!(queue.operation_count(), 0);
    }

    #[test]
    fn task_belongs_to_one_queue() {
        let first = TaskQueue::new();
        let second = TaskQueue::new();
        first.set_suspended(true);

        let task = Task::new();
        first.add_task(&task).unwrap();
        assert_eq!(first.add_task(&task), Err(TaskError::AlreadyEnqueued(task.id())));
        assert_eq!(second.add_task(&task), Err(TaskError::AlreadyEnqueued(task.id())));
        assert_eq!(first.operation_count(), 1);

        first.set_suspended(false);
        first.wait_until_all_tasks_are_finished();
    }

    #[test]
    fn started_task_is_rejected() {
        let queue = TaskQueue::new();
        let task = Task::new();
        task.start().unwrap();
        assert_eq!(queue.add_task(&task), Err(TaskError::AlreadyStarted(task.id())));
        assert!(task.owning_queue().is_none());
    }

    #[test]
    fn rejected_batch_is_not_attached() {
        let queue = TaskQueue::new();
        let fresh = Task::new();
        let done = Task::new();
        done.start().unwrap();

        let err = queue.add_tasks(&[fresh.clone(), done.clone()], false).unwrap_err();
        assert_eq!(err, TaskError::AlreadyStarted(done.id()));
        assert!(fresh.owning_queue().is_none());
        assert_eq!(queue.operation_count(), 0);

        queue.add_task(&fresh).unwrap();
        queue.wait_until_all_tasks_are_finished();
        assert!(fresh.is_finished());
    }

    #[test]
    fn duplicate_in_batch_is_rejected() {
        let queue = TaskQueue::new();
        let task = Task::new();
        assert_eq!(
            queue.add_tasks(&[task.clone(), task.clone()], false),
            Err(TaskError::AlreadyEnqueued(task.id()))
        );
        assert!(task.owning_queue().is_none());
    }

    #[test]
    fn suspended_queue_holds_tasks() {
        let queue = TaskQueue::new();
        queue.set_suspended(true);
        let task = queue.add_task_with_body(|| {});

        assert!(!task.wait_until_finished_timeout(Duration::from_millis(50)));
        assert_eq!(queue.operations(), vec![task.clone()]);
        assert_eq!(queue.metrics().tasks_pending[&Priority::Normal], 1);

        queue.set_suspended(false);
        assert!(task.wait_until_finished_timeout(WAIT));
        assert_eq!(task.outcome(), Some(TaskOutcome::Completed));
    }

    #[test]
    fn add_tasks_can_wait_for_batch() {
        let queue = TaskQueue::new();
        let (log, make) = recorder();
        let batch = vec![make("a"), make("b"), make("c")];

        queue.add_tasks(&batch, true).unwrap();
        assert!(batch.iter().all(Task::is_finished));
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[test]
    fn cancel_all_operations_skips_bodies() {
        let queue = TaskQueue::new();
        queue.set_suspended(true);
        let counter = Arc::new(AtomicUsize::new(0));
        let tasks: Vec<Task> = (0..5)
            .map(|_| {
                let c = Arc::clone(&counter);
                Task::with_body(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();
        queue.add_tasks(&tasks, false).unwrap();

        queue.cancel_all_operations();
        assert!(tasks.iter().all(Task::is_cancelled));

        queue.set_suspended(false);
        queue.wait_until_all_tasks_are_finished();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(tasks
            .iter()
            .all(|t| t.outcome() == Some(TaskOutcome::Cancelled)));
        assert_eq!(queue.metrics().tasks_cancelled, 5);
    }

    #[test]
    fn current_queue_is_set_inside_bodies() {
        let queue = TaskQueue::named("current-probe");
        let (tx, rx) = mpsc::channel();
        queue.add_task_with_body(move || {
            tx.send(TaskQueue::current()).unwrap();
        });

        let seen = rx.recv_timeout(WAIT).unwrap();
        assert_eq!(seen, Some(queue.clone()));
        assert!(TaskQueue::current().is_none());
    }

    #[test]
    fn main_queue_is_serial_singleton() {
        let main = TaskQueue::main();
        assert_eq!(main, TaskQueue::main());
        assert_eq!(main.name(), "main");
        assert_eq!(main.max_concurrent_tasks(), Some(1));

        let task = main.add_task_with_body(|| {});
        assert!(task.wait_until_finished_timeout(WAIT));
    }

    #[test]
    fn barrier_waits_for_earlier_tasks() {
        let queue = TaskQueue::new();
        queue.set_suspended(true);
        let (log, make) = recorder();
        let before = [make("before-1"), make("before-2")];
        queue.add_tasks(&before, false).unwrap();

        let l = Arc::clone(&log);
        let barrier = queue.add_barrier_task(move || l.lock().unwrap().push("barrier"));
        let after = make("after");
        after.set_priority(Priority::VeryHigh);
        queue.add_task(&after).unwrap();

        assert_eq!(barrier.dependencies().len(), 2);
        queue.set_suspended(false);
        queue.wait_until_all_tasks_are_finished();

        let log = log.lock().unwrap();
        let pos = |label| log.iter().position(|l| *l == label).unwrap();
        assert!(pos("before-1") < pos("barrier"));
        assert!(pos("before-2") < pos("barrier"));
        assert!(pos("barrier") < pos("after"));
    }

    #[test]
    fn dependency_across_queues() {
        let upstream = TaskQueue::new();
        let downstream = TaskQueue::new();
        upstream.set_suspended(true);
        let (log, make) = recorder();

        let first = make("first");
        let second = make("second");
        second.add_dependency(&first).unwrap();
        downstream.add_task(&second).unwrap();
        upstream.add_task(&first).unwrap();

        assert!(!second.wait_until_finished_timeout(Duration::from_millis(50)));
        upstream.set_suspended(false);
        assert!(second.wait_until_finished_timeout(WAIT));
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn panicking_task_does_not_stall_queue() {
        let queue = TaskQueue::serial("panics");
        let bad = queue.add_task_with_body(|| panic!("bad task"));
        let good = queue.add_task_with_body(|| {});

        queue.wait_until_all_tasks_are_finished();
        assert_eq!(bad.outcome(), Some(TaskOutcome::Panicked("bad task".into())));
        assert_eq!(good.outcome(), Some(TaskOutcome::Completed));

        let metrics = queue.metrics();
        assert_eq!(metrics.tasks_panicked, 1);
        assert_eq!(metrics.tasks_completed, 1);
        assert_eq!(metrics.tasks_enqueued, 2);
        assert_eq!(metrics.running, 0);
        assert_eq!(metrics.peak_concurrency, 1);
    }

    #[test]
    fn task_group_runs_on_queue() {
        let queue = TaskQueue::new();
        let (log, _) = recorder();
        let l = Arc::clone(&log);
        let group = TaskGroup::new(move || l.lock().unwrap().push("one"));
        let l = Arc::clone(&log);
        group.add_execution_block(move || l.lock().unwrap().push("two")).unwrap();

        queue.add_task(&group).unwrap();
        group.wait_until_finished();
        assert_eq!(*log.lock().unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn completion_runs_for_queued_task() {
        let queue = TaskQueue::new();
        let (tx, rx) = mpsc::channel();
        let task = Task::with_body(|| {});
        task.set_completion(move || tx.send("done").unwrap()).unwrap();
        queue.add_task(&task).unwrap();

        assert_eq!(rx.recv_timeout(WAIT).unwrap(), "done");
    }

    #[test]
    fn dropping_queue_retires_pending_tasks() {
        let queue = TaskQueue::new();
        queue.set_suspended(true);
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let task = queue.add_task_with_body(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        drop(queue);
        assert!(task.wait_until_finished_timeout(WAIT));
        assert_eq!(task.outcome(), Some(TaskOutcome::Cancelled));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(task.owning_queue().is_none());
    }

    #[test]
    fn bodies_blocking_on_batches_keep_the_pool_moving() {
        let workers = SchedulerContext::global().worker_threads();
        let outer = TaskQueue::new();
        let inner = TaskQueue::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let bodies: Vec<Task> = (0..workers * 2)
            .map(|_| {
                let inner = inner.clone();
                let counter = Arc::clone(&counter);
                outer.add_task_with_body(move || {
                    let c = Arc::clone(&counter);
                    let leaf = Task::with_body(move || {
                        c.fetch_add(1, Ordering::SeqCst);
                    });
                    inner.add_tasks(&[leaf], true).unwrap();
                })
            })
            .collect();

        for body in &bodies {
            assert!(body.wait_until_finished_timeout(WAIT));
            assert_eq!(body.outcome(), Some(TaskOutcome::Completed));
        }
        assert_eq!(counter.load(Ordering::SeqCst), workers * 2);
    }

    #[test]
    fn bodies_waiting_for_a_suspended_queue_resume_with_it() {
        let workers = SchedulerContext::global().worker_threads();
        let outer = TaskQueue::new();
        let gate = TaskQueue::new();
        gate.set_suspended(true);
        let gated = gate.add_task_with_body(|| {});

        let waiters: Vec<Task> = (0..workers + 1)
            .map(|_| {
                let gated = gated.clone();
                outer.add_task_with_body(move || gated.wait_until_finished())
            })
            .collect();

        std::thread::sleep(Duration::from_millis(50));
        assert!(waiters.iter().all(|w| !w.is_finished()));

        gate.set_suspended(false);
        for waiter in &waiters {
            assert!(waiter.wait_until_finished_timeout(WAIT));
        }
        outer.wait_until_all_tasks_are_finished();
        assert_eq!(outer.operation_count(), 0);
    }
}
